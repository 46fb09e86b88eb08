//! Module administration: inventory listing and applying a module selection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use modhub_core::error::AppError;
use modhub_core::result::AppResult;
use modhub_core::types::module::Module;
use modhub_core::types::version::Version;

use crate::context::RuntimeContext;
use crate::hooks::builtin::{ControlsHook, InstallHook, PermissionHook, UninstallHook};
use crate::hooks::dispatcher::{HookDispatcher, Participant};
use crate::registry::ModuleRegistry;
use crate::resolver::{BatchReport, DependencyResolver};

/// Status of one declared dependency, as shown on the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    /// Dependency slug.
    pub slug: String,
    /// A module with this slug was discovered.
    pub exists: bool,
    /// That module is enabled.
    pub enabled: bool,
}

/// One module as shown on the admin listing.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    /// The persisted record.
    pub module: Module,
    /// On-disk version is newer than the installed one.
    pub update_pending: bool,
    /// The module runs on the current core.
    pub core_supported: bool,
    /// The module exposes administrative controls.
    pub has_controls: bool,
    /// Declared dependencies and their state.
    pub dependencies: Vec<DependencyStatus>,
}

/// Everything discovered on an inventory pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    /// The application module, when it has a manifest.
    pub application: Option<ModuleStatus>,
    /// Extensions in directory order.
    pub extensions: Vec<ModuleStatus>,
    /// Stale records removed by reconciliation.
    pub removed: u64,
}

/// Result of applying a module selection.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    /// Enable results.
    pub batch: BatchReport,
    /// Slugs whose install routine ran and whose installed version was recorded.
    pub installed: Vec<String>,
    /// Permission names declared by the enabled modules.
    pub permissions: BTreeSet<String>,
}

/// Administrative workflows over the registry, resolver, and dispatcher.
#[derive(Debug, Clone)]
pub struct ModuleAdmin {
    registry: Arc<ModuleRegistry>,
    resolver: DependencyResolver,
    dispatcher: HookDispatcher,
    context: Arc<RuntimeContext>,
}

impl ModuleAdmin {
    /// Creates the admin workflow around an existing dispatcher.
    pub fn new(dispatcher: HookDispatcher) -> Self {
        let registry = dispatcher.registry().clone();
        let context = dispatcher.context().clone();
        let resolver = DependencyResolver::new(registry.clone(), context.core_namespace.clone());
        Self {
            registry,
            resolver,
            dispatcher,
            context,
        }
    }

    /// Returns the dependency resolver.
    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Discovers the application and every extension, reports their state,
    /// and removes records of modules that are gone.
    ///
    /// A module that fails to load is logged and left out of the listing.
    /// Its record is kept: the directory is still on disk.
    pub async fn inventory(&self) -> AppResult<Inventory> {
        let mut extensions = Vec::new();
        let mut unavailable = Vec::new();
        for dir in self.registry.scan(&self.context.ext_dir).await? {
            if dir.slug == self.context.core_namespace {
                continue;
            }
            match self.registry.discover(&dir.path, &dir.slug).await {
                Ok(Some(module)) => extensions.push(module),
                Ok(None) => {}
                Err(e) => {
                    warn!(slug = %dir.slug, error = %e, "Failed to load module");
                    unavailable.push(dir.slug);
                }
            }
        }

        let application = match self
            .registry
            .discover(&self.context.app_dir, &self.context.app_namespace)
            .await
        {
            Ok(app) => app,
            Err(e) => {
                warn!(slug = %self.context.app_namespace, error = %e, "Failed to load application");
                None
            }
        };

        let known: HashMap<&str, bool> = extensions
            .iter()
            .chain(application.iter())
            .map(|m| (m.slug.as_str(), m.enabled))
            .collect();

        let mut inventory = Inventory::default();
        for module in &extensions {
            let status = self
                .status(module, Participant::Extension(module), &known)
                .await;
            inventory.extensions.push(status);
        }
        if let Some(app) = &application {
            inventory.application = Some(
                self.status(app, Participant::Application(app), &known)
                    .await,
            );
        }

        let discovered: Vec<String> = extensions
            .iter()
            .map(|m| m.slug.clone())
            .chain(unavailable)
            .collect();
        inventory.removed = self.registry.reconcile(&discovered).await?;

        Ok(inventory)
    }

    async fn status(
        &self,
        module: &Module,
        participant: Participant<'_>,
        known: &HashMap<&str, bool>,
    ) -> ModuleStatus {
        let dependencies = module
            .dependencies
            .iter()
            .map(|slug| {
                let core = slug == &self.context.core_namespace;
                let state = known.get(slug.as_str()).copied();
                DependencyStatus {
                    slug: slug.clone(),
                    exists: core || state.is_some(),
                    enabled: core || state.unwrap_or(false),
                }
            })
            .collect();

        let has_controls = match self
            .dispatcher
            .dispatch_module(&ControlsHook, participant, true)
            .await
        {
            Ok(controls) => !controls.is_empty(),
            Err(e) => {
                warn!(slug = %module.slug, error = %e, "Could not read module controls");
                false
            }
        };

        ModuleStatus {
            update_pending: module.update_pending(),
            core_supported: module.core_supported(self.registry.core_version()),
            has_controls,
            dependencies,
            module: module.clone(),
        }
    }

    /// Makes `slugs` the enabled extension set, installs pending updates,
    /// and rebuilds the declared permission set.
    ///
    /// Problems are reported as notices; they never abort the selection.
    pub async fn apply_selection(&self, slugs: &[String]) -> AppResult<SelectionReport> {
        let batch = self.resolver.enable_set(slugs).await?;

        let mut installed = Vec::new();
        for slug in self.dispatcher.dispatch(&InstallHook).await? {
            let Some(mut module) = self.registry.find(&slug).await? else {
                continue;
            };
            module.installed_version = module.version.clone();
            self.registry.save(&module).await?;
            info!(slug = %slug, version = %module.version, "Module installed");
            installed.push(slug);
        }

        let permissions = self.dispatcher.dispatch(&PermissionHook).await?;

        if batch.missing_dependencies {
            self.context
                .notices
                .error("Some extensions could not be enabled because they are missing dependencies.")
                .await;
        }
        if batch.unsupported {
            self.context
                .notices
                .error("Some extensions could not be enabled because they are not supported.")
                .await;
        }

        Ok(SelectionReport {
            batch,
            installed,
            permissions,
        })
    }

    /// Runs the uninstall routine of one module and clears its installed version.
    ///
    /// Returns `false` when the module was not installed or its routine failed.
    pub async fn uninstall(&self, slug: &str) -> AppResult<bool> {
        let mut module = self
            .registry
            .find(slug)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Module '{slug}' not found")))?;

        let participant = if slug == self.context.app_namespace {
            Participant::Application(&module)
        } else {
            Participant::Extension(&module)
        };
        let done = self
            .dispatcher
            .dispatch_module(&UninstallHook, participant, false)
            .await?;
        if !done.iter().any(|s| s == slug) {
            return Ok(false);
        }

        module.installed_version = Version::none();
        self.registry.save(&module).await?;
        info!(slug = %slug, "Module uninstalled");
        Ok(true)
    }

    /// Control links of every enabled extension, keyed by slug.
    pub async fn controls(&self) -> AppResult<BTreeMap<String, BTreeMap<String, String>>> {
        let mut out = BTreeMap::new();
        for module in self
            .registry
            .list_enabled(&self.context.app_namespace)
            .await?
        {
            match self
                .dispatcher
                .dispatch_module(&ControlsHook, Participant::Extension(&module), true)
                .await
            {
                Ok(controls) if !controls.is_empty() => {
                    out.insert(module.slug.clone(), controls);
                }
                Ok(_) => {}
                Err(e) => warn!(slug = %module.slug, error = %e, "Could not read module controls"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::hooks::receiver::{HookReceiver, ReceiverRegistry};
    use modhub_core::config::AppConfig;
    use modhub_core::traits::store::ModuleStore;
    use modhub_core::types::module::ModuleFilter;
    use modhub_store::{MemoryManifestSource, MemoryModuleStore};

    #[derive(Debug)]
    struct Core;

    #[async_trait]
    impl HookReceiver for Core {
        async fn permission(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!(["administer_site"]))
        }
    }

    #[derive(Debug)]
    struct Blog;

    #[async_trait]
    impl HookReceiver for Blog {
        async fn permission(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!(["administer_blog"]))
        }

        async fn controls(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!({"Settings": "/admin/blog/settings"}))
        }

        async fn uninstall(&self, _params: &Value) -> AppResult<Value> {
            Ok(json!(true))
        }
    }

    async fn admin() -> (ModuleAdmin, MemoryManifestSource, Arc<RuntimeContext>) {
        let mut config = AppConfig::default();
        config.modules.core_version = Some("2.0".into());
        let context = Arc::new(RuntimeContext::from_config(&config));
        let manifests = MemoryManifestSource::new();
        let registry = Arc::new(ModuleRegistry::new(
            Arc::new(MemoryModuleStore::new()),
            Arc::new(manifests.clone()),
            context.core_version.clone(),
            context.app_namespace.clone(),
        ));
        let receivers = Arc::new(ReceiverRegistry::new());
        receivers.register("core", Arc::new(Core)).await;
        receivers.register("blog", Arc::new(Blog)).await;
        receivers.register("files", Arc::new(Core)).await;
        let dispatcher = HookDispatcher::new(registry, receivers, context.clone());

        for (slug, json) in [
            ("blog", r#"{"name":"Blog","version":"1.1","dependencies":{"files":"*","core":"*"}}"#),
            ("files", r#"{"name":"Files","version":"1.0"}"#),
            ("future", r#"{"name":"Future","version":"1.0","core_version":"9"}"#),
            ("orphan", r#"{"name":"Orphan","version":"1.0","dependencies":{"ghost":"*"}}"#),
        ] {
            manifests
                .insert_json(context.extension_dir(slug), json)
                .unwrap();
        }

        (ModuleAdmin::new(dispatcher), manifests, context)
    }

    #[tokio::test]
    async fn test_inventory_reports_dependencies_and_controls() {
        let (admin, _, _) = admin().await;
        let inventory = admin.inventory().await.unwrap();

        let slugs: Vec<&str> = inventory
            .extensions
            .iter()
            .map(|s| s.module.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["blog", "files", "future", "orphan"]);
        assert!(inventory.application.is_none());

        let blog = &inventory.extensions[0];
        assert!(blog.has_controls);
        assert!(blog.update_pending);
        assert_eq!(
            blog.dependencies,
            vec![
                DependencyStatus {
                    slug: "files".into(),
                    exists: true,
                    enabled: false
                },
                DependencyStatus {
                    slug: "core".into(),
                    exists: true,
                    enabled: true
                },
            ]
        );
        assert!(!inventory.extensions[2].core_supported);
        assert!(!inventory.extensions[3].dependencies[0].exists);
    }

    #[tokio::test]
    async fn test_inventory_reconciles_removed_modules() {
        let (admin, manifests, context) = admin().await;
        admin.inventory().await.unwrap();

        manifests.remove(&context.extension_dir("orphan"));
        let inventory = admin.inventory().await.unwrap();
        assert_eq!(inventory.removed, 1);
        assert!(admin.registry.find("orphan").await.unwrap().is_none());
    }

    /// Module store whose writes for one slug can be switched to fail.
    #[derive(Debug, Default)]
    struct FailingStore {
        inner: MemoryModuleStore,
        fail_saves: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ModuleStore for FailingStore {
        async fn find(&self, slug: &str) -> AppResult<Option<Module>> {
            self.inner.find(slug).await
        }

        async fn save(&self, module: &Module) -> AppResult<Module> {
            if module.slug == "blog" && self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::database("connection reset"));
            }
            self.inner.save(module).await
        }

        async fn delete(&self, slug: &str) -> AppResult<bool> {
            self.inner.delete(slug).await
        }

        async fn list(&self, filter: &ModuleFilter) -> AppResult<Vec<Module>> {
            self.inner.list(filter).await
        }

        async fn disable_all_except(&self, slug: &str) -> AppResult<u64> {
            self.inner.disable_all_except(slug).await
        }
    }

    #[tokio::test]
    async fn test_inventory_keeps_record_when_discovery_fails() {
        let mut config = AppConfig::default();
        config.modules.core_version = Some("2.0".into());
        let context = Arc::new(RuntimeContext::from_config(&config));
        let manifests = MemoryManifestSource::new();
        for (slug, json) in [
            ("blog", r#"{"name":"Blog","version":"1.1"}"#),
            ("files", r#"{"name":"Files","version":"1.0"}"#),
        ] {
            manifests
                .insert_json(context.extension_dir(slug), json)
                .unwrap();
        }
        let store = Arc::new(FailingStore::default());
        let registry = Arc::new(ModuleRegistry::new(
            store.clone(),
            Arc::new(manifests),
            context.core_version.clone(),
            context.app_namespace.clone(),
        ));
        let receivers = Arc::new(ReceiverRegistry::new());
        receivers.register("core", Arc::new(Core)).await;
        receivers.register("blog", Arc::new(Blog)).await;
        receivers.register("files", Arc::new(Core)).await;
        let admin = ModuleAdmin::new(HookDispatcher::new(registry, receivers, context));

        admin.inventory().await.unwrap();
        admin.apply_selection(&["blog".to_string()]).await.unwrap();

        store
            .fail_saves
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let inventory = admin.inventory().await.unwrap();
        assert_eq!(inventory.removed, 0);
        assert!(inventory.extensions.iter().all(|s| s.module.slug != "blog"));

        let blog = admin.registry.find("blog").await.unwrap().unwrap();
        assert!(blog.enabled);
        assert_eq!(blog.installed_version, Version::new("1.1"));
    }

    #[tokio::test]
    async fn test_apply_selection_installs_and_reports() {
        let (admin, _, context) = admin().await;
        admin.inventory().await.unwrap();

        let report = admin
            .apply_selection(&[
                "blog".to_string(),
                "future".to_string(),
                "orphan".to_string(),
            ])
            .await
            .unwrap();

        assert!(report.batch.missing_dependencies);
        assert!(report.batch.unsupported);
        assert_eq!(report.installed, vec!["blog", "files"]);
        assert!(report.permissions.contains("administer_blog"));
        assert!(report.permissions.contains("administer_site"));

        let blog = admin.registry.find("blog").await.unwrap().unwrap();
        assert!(blog.enabled);
        assert_eq!(blog.installed_version.as_str(), "1.1");
        assert!(!blog.update_pending());

        let notices = context.notices.all().await;
        assert_eq!(notices.len(), 2);
    }

    #[tokio::test]
    async fn test_uninstall_clears_installed_version() {
        let (admin, _, _) = admin().await;
        admin.inventory().await.unwrap();
        admin.apply_selection(&["blog".to_string()]).await.unwrap();

        assert!(admin.uninstall("blog").await.unwrap());
        let blog = admin.registry.find("blog").await.unwrap().unwrap();
        assert!(blog.installed_version.is_empty());

        assert!(!admin.uninstall("blog").await.unwrap());
        assert!(admin.uninstall("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_controls_of_enabled_extensions() {
        let (admin, _, _) = admin().await;
        admin.inventory().await.unwrap();
        admin.apply_selection(&["blog".to_string()]).await.unwrap();

        let controls = admin.controls().await.unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(
            controls["blog"].get("Settings").map(String::as_str),
            Some("/admin/blog/settings")
        );
    }
}
