//! The core module: its hook receiver and the controllers it routes to.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use modhub_core::error::AppError;
use modhub_core::result::AppResult;
use modhub_core::traits::user::ADMINISTER_SITE;
use modhub_plugin::hooks::builtin::NamedHook;
use modhub_plugin::{HookReceiver, ReceiverRegistry, RuntimeContext};
use modhub_router::{Controller, ControllerRegistry, ControllerScope, HttpMethod, Response};

/// Registers the core receiver and controllers.
pub async fn register(
    context: &RuntimeContext,
    receivers: &ReceiverRegistry,
    controllers: &ControllerRegistry,
) {
    receivers
        .register(context.core_namespace.clone(), Arc::new(CoreModule))
        .await;
    controllers.register("core.home", Arc::new(HomeController)).await;
    controllers.register("core.modules", Arc::new(ModulesController)).await;
    controllers
        .register("core.maintenance", Arc::new(MaintenanceController))
        .await;
}

/// Hook receiver of the core module.
#[derive(Debug)]
pub struct CoreModule;

#[async_trait]
impl HookReceiver for CoreModule {
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({
            "/": "core.home",
            "/admin/modules": "core.modules",
        }))
    }

    async fn maintenance_route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({ "/admin/modules": "core.modules" }))
    }

    async fn maintenance_controller(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!("core.maintenance"))
    }

    async fn permission(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!([ADMINISTER_SITE]))
    }
}

/// Front page. Modules can contribute through `preprocess_page`.
#[derive(Debug)]
pub struct HomeController;

#[async_trait]
impl Controller for HomeController {
    fn methods(&self) -> &[HttpMethod] {
        &[HttpMethod::Get, HttpMethod::Head]
    }

    async fn call(&self, _method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response> {
        let hook = NamedHook::new("preprocess_page", json!({ "path": scope.request.path }));
        let contributions: BTreeMap<String, Value> =
            scope.dispatcher.dispatch(&hook).await?.into_iter().collect();

        let body = scope.renderer.render(
            "home.html",
            &json!({ "path": scope.request.path, "contributions": contributions }),
        )?;
        Ok(Response::ok(body))
    }
}

/// Module listing for administrators.
#[derive(Debug)]
pub struct ModulesController;

#[async_trait]
impl Controller for ModulesController {
    fn methods(&self) -> &[HttpMethod] {
        &[HttpMethod::Get]
    }

    async fn call(&self, _method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response> {
        if !scope.user.is_admin() {
            return Err(AppError::authorization(
                "Module administration requires administer_site.",
            ));
        }
        let modules = scope.dispatcher.registry().list_all().await?;
        let body = scope
            .renderer
            .render("modules.html", &json!({ "modules": modules }))?;
        Ok(Response::ok(body))
    }
}

/// Catch-all page served in maintenance mode.
#[derive(Debug)]
pub struct MaintenanceController;

#[async_trait]
impl Controller for MaintenanceController {
    fn methods(&self) -> &[HttpMethod] {
        &[HttpMethod::Get, HttpMethod::Head, HttpMethod::Post]
    }

    async fn call(&self, _method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response> {
        let body = scope
            .renderer
            .render("maintenance.html", &json!({ "path": scope.request.path }))?;
        Ok(Response::page(503, body))
    }
}
