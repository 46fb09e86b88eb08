//! Runtime assembly: stores, context, registry, dispatcher, controllers.

use std::sync::Arc;

use tracing::{info, warn};

use modhub_core::config::AppConfig;
use modhub_core::result::AppResult;
use modhub_core::traits::store::{ModuleStore, SettingsStore};
use modhub_core::traits::user::CurrentUser;
use modhub_database::connection::DatabasePool;
use modhub_plugin::{
    FsManifestSource, HookDispatcher, ModuleAdmin, ModuleRegistry, ReceiverRegistry, RuntimeContext,
};
use modhub_router::{ControllerRegistry, RequestContext, Router, TextRenderer};
use modhub_store::{MemoryModuleStore, MemorySettingsStore};

use crate::site;

/// Everything needed to serve a request or run an admin action.
#[derive(Debug)]
pub struct Runtime {
    config: AppConfig,
    dispatcher: Arc<HookDispatcher>,
    controllers: Arc<ControllerRegistry>,
    settings: Arc<dyn SettingsStore>,
    database: Option<DatabasePool>,
}

impl Runtime {
    /// Opens the stores and resolves the request context.
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        let (modules, settings, database) = open_stores(&config).await?;

        let manifests = Arc::new(FsManifestSource::new());
        let context =
            Arc::new(RuntimeContext::resolve(&config, manifests.as_ref(), settings.as_ref()).await?);
        info!(
            core_version = %context.core_version,
            debug = context.debug,
            ext_dir = %context.ext_dir.display(),
            "Runtime started"
        );

        let registry = Arc::new(ModuleRegistry::new(
            modules,
            manifests,
            context.core_version.clone(),
            context.app_namespace.clone(),
        ));

        let receivers = Arc::new(ReceiverRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        site::register(&context, &receivers, &controllers).await;

        let dispatcher = Arc::new(HookDispatcher::new(registry, receivers, context));

        Ok(Self {
            config,
            dispatcher,
            controllers,
            settings,
            database,
        })
    }

    /// The runtime context of this invocation.
    pub fn context(&self) -> &RuntimeContext {
        self.dispatcher.context()
    }

    /// The system settings store.
    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Module administration over this runtime.
    pub fn admin(&self) -> ModuleAdmin {
        ModuleAdmin::new(self.dispatcher.as_ref().clone())
    }

    /// A router for one request line.
    pub fn router(&self, request: RequestContext, user: Arc<dyn CurrentUser>) -> Router {
        Router::new(
            request,
            self.dispatcher.clone(),
            self.controllers.clone(),
            self.settings.clone(),
            Arc::new(TextRenderer),
            user,
        )
        .with_site_url(self.config.site.site_url.clone())
    }

    /// Configuration this runtime was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Releases database connections.
    pub async fn shutdown(&self) {
        if let Some(database) = &self.database {
            database.close().await;
        }
    }
}

type Stores = (Arc<dyn ModuleStore>, Arc<dyn SettingsStore>, Option<DatabasePool>);

async fn open_stores(config: &AppConfig) -> AppResult<Stores> {
    let Some(db_config) = &config.database else {
        warn!("No database configured, module state lives in memory for this invocation");
        let modules: Arc<dyn ModuleStore> = Arc::new(MemoryModuleStore::new());
        let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
        return Ok((modules, settings, None));
    };

    let database = DatabasePool::connect_and_migrate(db_config).await?;
    let modules: Arc<dyn ModuleStore> = database.module_store();
    let settings: Arc<dyn SettingsStore> = database.settings_store();
    Ok((modules, settings, Some(database)))
}
