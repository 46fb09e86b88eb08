//! End-to-end request flow over the in-memory stores: module selection,
//! three-tier route collection, matching and the fallback chain.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use modhub_core::config::AppConfig;
use modhub_core::result::AppResult;
use modhub_core::traits::store::SettingsStore;
use modhub_plugin::context::MAINTENANCE_SETTING;
use modhub_plugin::{HookDispatcher, HookReceiver, ModuleAdmin, ModuleRegistry, ReceiverRegistry, RuntimeContext};
use modhub_router::{
    Controller, ControllerRegistry, ControllerScope, HttpMethod, RequestContext, Response,
    Router, SessionUser, TextRenderer,
};
use modhub_store::{MemoryManifestSource, MemoryModuleStore, MemorySettingsStore};

#[derive(Debug)]
struct Core;

#[async_trait]
impl HookReceiver for Core {
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({ "/": "core.home", "/shop": "core.home" }))
    }

    async fn maintenance_route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({ "/login": "core.home" }))
    }
}

#[derive(Debug)]
struct Shop;

#[async_trait]
impl HookReceiver for Shop {
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({ "/shop": "shop.index", "/shop/(?P<item>[a-z]+)": "shop.index" }))
    }

    async fn permission(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!(["buy"]))
    }
}

#[derive(Debug)]
struct Blog;

#[async_trait]
impl HookReceiver for Blog {
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Ok(json!({ "/blog": "shop.index" }))
    }
}

#[derive(Debug)]
struct Flaky;

#[async_trait]
impl HookReceiver for Flaky {
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Err(modhub_core::error::AppError::internal("route table unavailable"))
    }
}

#[derive(Debug)]
struct Page(&'static str);

#[async_trait]
impl Controller for Page {
    fn methods(&self) -> &[HttpMethod] {
        &[HttpMethod::Get, HttpMethod::Head]
    }

    async fn call(&self, _method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response> {
        let item = scope.matches.name("item").unwrap_or("-");
        Ok(Response::ok(format!("{}:{item}", self.0)))
    }
}

struct Site {
    dispatcher: Arc<HookDispatcher>,
    admin: ModuleAdmin,
    controllers: Arc<ControllerRegistry>,
    settings: Arc<MemorySettingsStore>,
}

impl Site {
    async fn new() -> Self {
        let mut config = AppConfig::default();
        config.modules.core_version = Some("2.0".into());
        let context = Arc::new(RuntimeContext::from_config(&config));

        let manifests = MemoryManifestSource::new();
        for (slug, manifest) in [
            ("shop", r#"{"name":"Shop","version":"1.0","dependencies":{"core":"*"}}"#),
            ("blog", r#"{"name":"Blog","version":"1.0","dependencies":{"users":"*"}}"#),
            ("legacy", r#"{"name":"Legacy","version":"1.0","core_version":"9.0"}"#),
            ("flaky", r#"{"name":"Flaky","version":"1.0"}"#),
        ] {
            manifests
                .insert_json(context.extension_dir(slug), manifest)
                .unwrap();
        }

        let registry = Arc::new(ModuleRegistry::new(
            Arc::new(MemoryModuleStore::new()),
            Arc::new(manifests),
            context.core_version.clone(),
            context.app_namespace.clone(),
        ));
        let receivers = Arc::new(ReceiverRegistry::new());
        receivers.register("core", Arc::new(Core)).await;
        receivers.register("shop", Arc::new(Shop)).await;
        receivers.register("blog", Arc::new(Blog)).await;
        receivers.register("flaky", Arc::new(Flaky)).await;

        let dispatcher = HookDispatcher::new(registry, receivers, context);
        let admin = ModuleAdmin::new(dispatcher.clone());

        let controllers = Arc::new(ControllerRegistry::new());
        controllers.register("core.home", Arc::new(Page("home"))).await;
        controllers.register("shop.index", Arc::new(Page("shop"))).await;

        Self {
            dispatcher: Arc::new(dispatcher),
            admin,
            controllers,
            settings: Arc::new(MemorySettingsStore::new()),
        }
    }

    async fn request(&self, method: HttpMethod, uri: &str, user: SessionUser) -> Response {
        let router = Router::new(
            RequestContext::parse(method, uri, &Default::default()),
            self.dispatcher.clone(),
            self.controllers.clone(),
            self.settings.clone(),
            Arc::new(TextRenderer),
            Arc::new(user),
        );
        router.boot().await.unwrap();
        router.run(None).await.unwrap()
    }
}

fn slugs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_selection_drives_route_table() {
    let site = Site::new().await;
    site.admin.inventory().await.unwrap();

    // Core alone serves /shop.
    let before = site.request(HttpMethod::Get, "/shop", SessionUser::anonymous()).await;
    assert_eq!(before, Response::ok("home:-"));

    let report = site
        .admin
        .apply_selection(&slugs(&["shop", "blog", "legacy"]))
        .await
        .unwrap();
    assert!(report.batch.missing_dependencies);
    assert!(report.batch.unsupported);
    assert_eq!(report.batch.enabled().collect::<Vec<_>>(), vec!["shop"]);
    assert!(report.permissions.contains("buy"));

    // The enabled extension overrides the core pattern.
    let after = site.request(HttpMethod::Get, "/shop", SessionUser::anonymous()).await;
    assert_eq!(after, Response::ok("shop:-"));

    let item = site.request(HttpMethod::Get, "/Shop/hats/", SessionUser::anonymous()).await;
    assert_eq!(item, Response::ok("shop:hats"));

    // Blog stayed disabled, so its route never joined the table.
    let blog = site.request(HttpMethod::Get, "/blog", SessionUser::member(["buy"])).await;
    assert_eq!(blog.status(), 404);
}

#[tokio::test]
async fn test_failing_extension_is_contained() {
    let site = Site::new().await;
    site.admin.inventory().await.unwrap();
    site.admin
        .apply_selection(&slugs(&["shop", "flaky"]))
        .await
        .unwrap();

    let response = site.request(HttpMethod::Get, "/shop/hats", SessionUser::anonymous()).await;
    assert_eq!(response, Response::ok("shop:hats"));
}

#[tokio::test]
async fn test_unsupported_method_for_member_is_not_found_page() {
    let site = Site::new().await;
    let response = site.request(HttpMethod::Delete, "/shop", SessionUser::member(["buy"])).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_maintenance_redirect_loop_is_prevented() {
    let site = Site::new().await;
    site.settings
        .set(MAINTENANCE_SETTING, Some("1"))
        .await
        .unwrap();

    // Nothing provides a maintenance controller, so every unmatched path fails.
    let away = site.request(HttpMethod::Get, "/shop", SessionUser::anonymous()).await;
    assert_eq!(away.location(), Some("/"));

    let home = site.request(HttpMethod::Get, "/", SessionUser::anonymous()).await;
    assert_eq!(home.status(), 500);
    assert!(home.body().unwrap().starts_with("[500.html]"));

    let login = site.request(HttpMethod::Get, "/login", SessionUser::anonymous()).await;
    assert_eq!(login, Response::ok("home:-"));

    let admin = site.request(HttpMethod::Get, "/", SessionUser::admin()).await;
    assert!(admin.body().unwrap().starts_with("[debug.html]"));
}
