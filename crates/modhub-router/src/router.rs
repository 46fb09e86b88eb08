//! Request routing and the fallback chain.
//!
//! A [`Router`] serves exactly one request. [`Router::run`] collects the route
//! table (unless one is supplied), fires `post_boot`, matches the request
//! path, and calls the controller. Any error raised while matching or
//! handling is turned into a response by the fallback chain, in this order:
//!
//! 1. maintenance mode and not an administrator: redirect to `/`
//! 2. debug mode or an administrator: a diagnostic page
//! 3. anonymous: log, then redirect to `/`
//! 4. otherwise: the not-found page
//!
//! A redirect to `/` while already serving `/` renders the loop-safe error
//! page instead.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use modhub_core::error::AppError;
use modhub_core::result::AppResult;
use modhub_core::traits::presentation::ViewRenderer;
use modhub_core::traits::store::SettingsStore;
use modhub_core::traits::user::CurrentUser;
use modhub_plugin::context::MAINTENANCE_SETTING;
use modhub_plugin::hooks::builtin::{BootHook, MaintenanceControllerHook, RouteHook};
use modhub_plugin::hooks::dispatcher::HookDispatcher;

use crate::controller::{ControllerRegistry, ControllerScope};
use crate::request::RequestContext;
use crate::response::Response;
use crate::table::{RouteMatch, RouteTable};

/// View rendered for diagnostic error pages.
pub const DEBUG_VIEW: &str = "debug.html";
/// View rendered when nothing matched.
pub const NOT_FOUND_VIEW: &str = "404.html";
/// View rendered instead of a redirect that would loop.
pub const LOOP_SAFE_VIEW: &str = "500.html";

/// Routes one request.
#[derive(Debug)]
pub struct Router {
    request: RequestContext,
    dispatcher: Arc<HookDispatcher>,
    controllers: Arc<ControllerRegistry>,
    settings: Arc<dyn SettingsStore>,
    renderer: Arc<dyn ViewRenderer>,
    user: Arc<dyn CurrentUser>,
    site_url: String,
}

impl Router {
    /// Creates a router for `request`.
    pub fn new(
        request: RequestContext,
        dispatcher: Arc<HookDispatcher>,
        controllers: Arc<ControllerRegistry>,
        settings: Arc<dyn SettingsStore>,
        renderer: Arc<dyn ViewRenderer>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self {
            request,
            dispatcher,
            controllers,
            settings,
            renderer,
            user,
            site_url: String::new(),
        }
    }

    /// Sets the base URL used for absolute page URLs in logs and pages.
    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = site_url.into();
        self
    }

    /// The request being served.
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Fires `pre_boot`.
    pub async fn boot(&self) -> AppResult<()> {
        self.dispatcher.dispatch(&BootHook::pre()).await
    }

    /// Serves the request.
    ///
    /// Without a `table` the route table is collected through the `route`
    /// hook, or `maintenance_route` in maintenance mode. Failures of those
    /// dispatches are core faults and are returned as errors; everything
    /// raised while matching and handling goes through the fallback chain.
    pub async fn run(&self, table: Option<RouteTable>) -> AppResult<Response> {
        let maintenance = self.settings.flag(MAINTENANCE_SETTING).await?;

        let table = match table {
            Some(table) => table,
            None => {
                let hook = if maintenance {
                    RouteHook::maintenance()
                } else {
                    RouteHook::normal()
                };
                RouteTable::from(self.dispatcher.dispatch(&hook).await?)
            }
        };

        self.dispatcher.dispatch(&BootHook::post()).await?;

        match self.route(&table, maintenance).await {
            Ok(response) => Ok(response),
            Err(err) => self.fallback(err, maintenance),
        }
    }

    async fn route(&self, table: &RouteTable, maintenance: bool) -> AppResult<Response> {
        let found = match table.find(&self.request.path)? {
            Some(found) => found,
            None if maintenance => {
                let controller = self
                    .dispatcher
                    .dispatch(&MaintenanceControllerHook)
                    .await?
                    .ok_or_else(|| AppError::configuration("No maintenance controller provided."))?;
                debug!(controller = %controller, "Serving maintenance controller");
                RouteMatch::catch_all(controller)
            }
            None => {
                return Err(AppError::route_not_found(format!(
                    "URL, {}, not found.",
                    self.request.path
                )));
            }
        };

        debug!(
            path = %self.request.path,
            pattern = %found.pattern,
            controller = %found.controller,
            "Route matched"
        );
        self.call(&found).await
    }

    async fn call(&self, found: &RouteMatch) -> AppResult<Response> {
        let controller = self.controllers.resolve(&found.controller).await?;
        let method = self.request.method;
        if !controller.supports(method) {
            return Err(AppError::unsupported_method(format!(
                "Method, {method}, not supported on {}.",
                found.controller
            )));
        }

        let scope = ControllerScope {
            request: &self.request,
            matches: found,
            dispatcher: self.dispatcher.as_ref(),
            renderer: self.renderer.as_ref(),
            user: self.user.as_ref(),
        };
        match controller.call(method, scope).await {
            Ok(response) => Ok(response),
            Err(err) => controller.handle_error(err, scope).await,
        }
    }

    fn fallback(&self, err: AppError, maintenance: bool) -> AppResult<Response> {
        let debug_mode = self.dispatcher.context().debug;
        let admin = self.user.is_admin();

        let url = self.request.page_url(&self.site_url);
        warn!(
            kind = %err.kind,
            error = %err,
            url = %url,
            maintenance,
            admin,
            "Routing exception"
        );

        if maintenance && !admin {
            info!(url = %url, "Maintenance mode, redirecting home");
            return self.redirect_home();
        }

        if debug_mode || admin {
            let body = self.renderer.render(
                DEBUG_VIEW,
                &json!({
                    "message": err.message,
                    "kind": err.kind,
                    "expected": err.kind.is_expected(),
                    "version": env!("CARGO_PKG_VERSION"),
                    "core_version": self.dispatcher.context().core_version.as_str(),
                }),
            )?;
            return Ok(Response::page(500, body));
        }

        if !self.user.is_authenticated() {
            error!(kind = %err.kind, error = %err, url = %url, "Request failed");
            return self.redirect_home();
        }

        debug!(kind = %err.kind, url = %url, "Serving not-found page");
        let body = self.renderer.render(NOT_FOUND_VIEW, &json!({ "path": url }))?;
        Ok(Response::page(404, body))
    }

    fn redirect_home(&self) -> AppResult<Response> {
        if !self.request.is_active_url("/", true) {
            return Ok(Response::redirect("/"));
        }

        let err = AppError::redirect_loop(format!(
            "Redirect to / from {} would loop.",
            self.request.path
        ));
        warn!(kind = %err.kind, path = %self.request.path, "Detected a potential redirect loop");
        let body = self.renderer.render(LOOP_SAFE_VIEW, &json!({ "message": err.message }))?;
        Ok(Response::page(500, body))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::controller::{Controller, HttpMethod};
    use crate::render::TextRenderer;
    use crate::user::SessionUser;
    use modhub_core::config::{AppConfig, RoutingConfig};
    use modhub_core::error::ErrorKind;
    use modhub_core::types::version::Version;
    use modhub_plugin::context::RuntimeContext;
    use modhub_plugin::hooks::receiver::{HookReceiver, ReceiverRegistry};
    use modhub_plugin::registry::ModuleRegistry;
    use modhub_store::{MemoryManifestSource, MemoryModuleStore, MemorySettingsStore};

    #[derive(Debug, Default)]
    struct Core {
        post_boots: AtomicUsize,
    }

    #[async_trait]
    impl HookReceiver for Core {
        async fn route(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!({ "/": "home", "/post/(\\d+)": "post" }))
        }

        async fn maintenance_route(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!({ "/login": "home" }))
        }

        async fn maintenance_controller(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!("offline"))
        }

        async fn post_boot(&self, _params: &Value) -> AppResult<Value> {
            self.post_boots.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    }

    #[derive(Debug)]
    struct Echo(&'static str);

    #[async_trait]
    impl Controller for Echo {
        fn methods(&self) -> &[HttpMethod] {
            &[HttpMethod::Get]
        }

        async fn call(&self, _method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response> {
            Ok(Response::ok(format!("{}:{}", self.0, scope.matches.group(1).unwrap_or("-"))))
        }
    }

    #[derive(Debug)]
    struct Broken {
        recover: bool,
    }

    #[async_trait]
    impl Controller for Broken {
        fn methods(&self) -> &[HttpMethod] {
            &[HttpMethod::Get]
        }

        async fn call(&self, _method: HttpMethod, _scope: ControllerScope<'_>) -> AppResult<Response> {
            Err(AppError::internal("controller failed"))
        }

        async fn handle_error(&self, error: AppError, _scope: ControllerScope<'_>) -> AppResult<Response> {
            if self.recover {
                Ok(Response::page(503, "recovered"))
            } else {
                Err(error)
            }
        }
    }

    struct Fixture {
        core: Arc<Core>,
        dispatcher: Arc<HookDispatcher>,
        controllers: Arc<ControllerRegistry>,
        settings: Arc<MemorySettingsStore>,
    }

    impl Fixture {
        async fn new(debug: bool, maintenance: bool) -> Self {
            let mut config = AppConfig::default();
            config.site.debug = debug;
            config.modules.core_version = Some("3.1".into());
            let context = Arc::new(RuntimeContext::from_config(&config));

            let registry = Arc::new(ModuleRegistry::new(
                Arc::new(MemoryModuleStore::new()),
                Arc::new(MemoryManifestSource::new()),
                Version::new("3.1"),
                "app",
            ));
            let receivers = Arc::new(ReceiverRegistry::new());
            let core = Arc::new(Core::default());
            receivers.register("core", core.clone()).await;
            let dispatcher = Arc::new(HookDispatcher::new(registry, receivers, context));

            let controllers = Arc::new(ControllerRegistry::new());
            controllers.register("home", Arc::new(Echo("home"))).await;
            controllers.register("post", Arc::new(Echo("post"))).await;
            controllers.register("offline", Arc::new(Echo("offline"))).await;
            controllers.register("broken", Arc::new(Broken { recover: false })).await;
            controllers.register("recovering", Arc::new(Broken { recover: true })).await;

            let flag = if maintenance { "1" } else { "0" };
            let settings = Arc::new(MemorySettingsStore::with_values([(MAINTENANCE_SETTING, flag)]));

            Self {
                core,
                dispatcher,
                controllers,
                settings,
            }
        }

        fn router(&self, method: HttpMethod, uri: &str, user: SessionUser) -> Router {
            Router::new(
                RequestContext::parse(method, uri, &RoutingConfig::default()),
                self.dispatcher.clone(),
                self.controllers.clone(),
                self.settings.clone(),
                Arc::new(TextRenderer),
                Arc::new(user),
            )
            .with_site_url("http://example.test")
        }
    }

    #[tokio::test]
    async fn test_collects_table_and_matches_groups() {
        let fx = Fixture::new(false, false).await;
        let response = fx
            .router(HttpMethod::Get, "/post/7?x=1", SessionUser::anonymous())
            .run(None)
            .await
            .unwrap();
        assert_eq!(response, Response::ok("post:7"));
        assert_eq!(fx.core.post_boots.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_supplied_table_skips_route_hook_but_not_post_boot() {
        let fx = Fixture::new(false, false).await;
        let table = RouteTable::new().with("/custom", "home");
        let router = fx.router(HttpMethod::Get, "/custom", SessionUser::anonymous());
        assert_eq!(router.run(Some(table)).await.unwrap(), Response::ok("home:-"));
        assert_eq!(fx.core.post_boots.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_for_member_renders_404() {
        let fx = Fixture::new(false, false).await;
        let response = fx
            .router(HttpMethod::Get, "/nowhere", SessionUser::member(["view"]))
            .run(None)
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert!(response.body().unwrap().contains("http://example.test/nowhere"));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_every_fallback_branch_logs_the_error() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fx = Fixture::new(false, false).await;
        let member = fx
            .router(HttpMethod::Get, "/nowhere", SessionUser::member(["view"]))
            .run(None)
            .await
            .unwrap();
        assert_eq!(member.status(), 404);
        assert!(logs.contents().contains("URL, /nowhere, not found."));

        let fx = Fixture::new(false, true).await;
        let table = RouteTable::new().with("/x", "broken");
        let redirected = fx
            .router(HttpMethod::Get, "/x", SessionUser::member(["view"]))
            .run(Some(table))
            .await
            .unwrap();
        assert_eq!(redirected.location(), Some("/"));
        assert!(logs.contents().contains("controller failed"));
    }

    #[tokio::test]
    async fn test_anonymous_failure_redirects_home() {
        let fx = Fixture::new(false, false).await;
        let response = fx
            .router(HttpMethod::Get, "/nowhere", SessionUser::anonymous())
            .run(None)
            .await
            .unwrap();
        assert_eq!(response.location(), Some("/"));
    }

    #[tokio::test]
    async fn test_anonymous_failure_on_home_is_loop_safe() {
        let fx = Fixture::new(false, false).await;
        let table = RouteTable::new().with("/", "broken");
        let response = fx
            .router(HttpMethod::Get, "/", SessionUser::anonymous())
            .run(Some(table))
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        assert!(response.body().unwrap().starts_with("[500.html]"));
    }

    #[tokio::test]
    async fn test_admin_sees_diagnostics() {
        let fx = Fixture::new(false, false).await;
        let response = fx
            .router(HttpMethod::Post, "/", SessionUser::admin())
            .run(None)
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        let body = response.body().unwrap();
        assert!(body.starts_with("[debug.html]"));
        assert!(body.contains("UnsupportedMethod"));
        assert!(body.contains("\"core_version\": \"3.1\""));
    }

    #[tokio::test]
    async fn test_debug_mode_shows_diagnostics_to_anonymous() {
        let fx = Fixture::new(true, false).await;
        let response = fx
            .router(HttpMethod::Get, "/nowhere", SessionUser::anonymous())
            .run(None)
            .await
            .unwrap();
        assert!(response.body().unwrap().contains("RouteNotFound"));
    }

    #[tokio::test]
    async fn test_unknown_controller_is_configuration_error() {
        let fx = Fixture::new(false, false).await;
        let table = RouteTable::new().with("/x", "ghost");
        let response = fx
            .router(HttpMethod::Get, "/x", SessionUser::admin())
            .run(Some(table))
            .await
            .unwrap();
        assert!(response.body().unwrap().contains("Configuration"));
    }

    #[tokio::test]
    async fn test_first_match_is_final() {
        let fx = Fixture::new(false, false).await;
        // "/x/y" is tried first and fails; "/x/.*" is never tried.
        let table = RouteTable::new().with("/x/y", "broken").with("/x/.*", "home");
        let response = fx
            .router(HttpMethod::Get, "/x/y", SessionUser::member(["view"]))
            .run(Some(table))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_controller_handles_own_error() {
        let fx = Fixture::new(false, false).await;
        let table = RouteTable::new().with("/r", "recovering");
        let response = fx
            .router(HttpMethod::Get, "/r", SessionUser::anonymous())
            .run(Some(table))
            .await
            .unwrap();
        assert_eq!(response, Response::page(503, "recovered"));
    }

    #[tokio::test]
    async fn test_maintenance_uses_maintenance_table_and_catch_all() {
        let fx = Fixture::new(false, true).await;

        let login = fx
            .router(HttpMethod::Get, "/login", SessionUser::anonymous())
            .run(None)
            .await
            .unwrap();
        assert_eq!(login, Response::ok("home:-"));

        let other = fx
            .router(HttpMethod::Get, "/post/7", SessionUser::anonymous())
            .run(None)
            .await
            .unwrap();
        assert_eq!(other, Response::ok("offline:-"));
    }

    #[tokio::test]
    async fn test_maintenance_failure_redirects_non_admin() {
        let fx = Fixture::new(true, true).await;
        let table = RouteTable::new().with("/x", "broken");

        let user = fx
            .router(HttpMethod::Get, "/x", SessionUser::member(["view"]))
            .run(Some(table.clone()))
            .await
            .unwrap();
        assert_eq!(user.location(), Some("/"));

        let admin = fx
            .router(HttpMethod::Get, "/x", SessionUser::admin())
            .run(Some(table))
            .await
            .unwrap();
        assert_eq!(admin.status(), 500);
        assert!(admin.body().unwrap().starts_with("[debug.html]"));
    }

    #[tokio::test]
    async fn test_missing_core_receiver_is_fatal() {
        let fx = Fixture::new(false, false).await;
        let receivers = Arc::new(ReceiverRegistry::new());
        let dispatcher = Arc::new(HookDispatcher::new(
            fx.dispatcher.registry().clone(),
            receivers,
            fx.dispatcher.context().clone(),
        ));
        let router = Router::new(
            RequestContext::parse(HttpMethod::Get, "/", &RoutingConfig::default()),
            dispatcher,
            fx.controllers.clone(),
            fx.settings.clone(),
            Arc::new(TextRenderer),
            Arc::new(SessionUser::anonymous()),
        );
        let err = router.run(None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
