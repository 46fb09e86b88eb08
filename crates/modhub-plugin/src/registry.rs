//! Module registry: reconciles on-disk modules with persisted module records.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use modhub_core::result::AppResult;
use modhub_core::traits::manifest::{ManifestSource, ModuleDir};
use modhub_core::traits::store::ModuleStore;
use modhub_core::types::module::{Module, ModuleFilter};
use modhub_core::types::version::Version;

/// Source of truth for which modules exist and what state they are in.
///
/// Every mutation goes straight to the backing [`ModuleStore`], so changes
/// are visible to later calls in this request and to other requests.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    store: Arc<dyn ModuleStore>,
    manifests: Arc<dyn ManifestSource>,
    core_version: Version,
    app_slug: String,
}

impl ModuleRegistry {
    /// Creates a registry over the given store and manifest source.
    pub fn new(
        store: Arc<dyn ModuleStore>,
        manifests: Arc<dyn ManifestSource>,
        core_version: Version,
        app_slug: impl Into<String>,
    ) -> Self {
        Self {
            store,
            manifests,
            core_version,
            app_slug: app_slug.into(),
        }
    }

    /// Version of the running core.
    pub fn core_version(&self) -> &Version {
        &self.core_version
    }

    /// Slug of the application module.
    pub fn app_slug(&self) -> &str {
        &self.app_slug
    }

    /// Reads the manifest at `path` and merges it into the record for `slug`.
    ///
    /// Returns `Ok(None)` when `path` has no manifest. A new record starts
    /// disabled and never installed. A record whose minimum core version is
    /// above the running core is forced disabled. Store failures are
    /// returned to the caller, who should treat the module as unavailable
    /// and carry on with any other modules.
    pub async fn discover(&self, path: &Path, slug: &str) -> AppResult<Option<Module>> {
        let Some(manifest) = self.manifests.read(path).await? else {
            debug!(slug = %slug, path = %path.display(), "No manifest found");
            return Ok(None);
        };

        let mut module = match self.store.find(slug).await? {
            Some(mut existing) => {
                existing.apply_manifest(&manifest);
                existing
            }
            None => {
                info!(slug = %slug, version = %manifest.version, "Discovered new module");
                Module::discovered(slug, &manifest)
            }
        };

        if module.enabled && !module.core_supported(&self.core_version) {
            warn!(
                slug = %slug,
                min_core_version = ?module.min_core_version.as_ref().map(Version::as_str),
                core_version = %self.core_version,
                "Disabling module that does not support the running core"
            );
            module.enabled = false;
        }

        let saved = self.store.save(&module).await.map_err(|e| {
            warn!(slug = %slug, error = %e, "Failed to persist discovered module");
            e
        })?;

        Ok(Some(saved))
    }

    /// Enabled modules except `excluding`, in registry iteration order.
    pub async fn list_enabled(&self, excluding: &str) -> AppResult<Vec<Module>> {
        self.store
            .list(&ModuleFilter::enabled_except(excluding))
            .await
    }

    /// Every module record, in registry iteration order.
    pub async fn list_all(&self) -> AppResult<Vec<Module>> {
        self.store.list(&ModuleFilter::All).await
    }

    /// Deletes records that were not discovered, keeping the application module.
    ///
    /// Returns the number of records removed.
    pub async fn reconcile(&self, discovered: &[String]) -> AppResult<u64> {
        let mut keep: Vec<String> = discovered.to_vec();
        if !keep.iter().any(|s| s == &self.app_slug) {
            keep.push(self.app_slug.clone());
        }

        let stale = self.store.list(&ModuleFilter::SlugNotIn(keep)).await?;
        let mut removed = 0;
        for module in &stale {
            if self.store.delete(&module.slug).await? {
                info!(slug = %module.slug, "Removed module that is no longer on disk");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Finds a record by slug.
    pub async fn find(&self, slug: &str) -> AppResult<Option<Module>> {
        self.store.find(slug).await
    }

    /// Persists a record.
    pub async fn save(&self, module: &Module) -> AppResult<Module> {
        self.store.save(module).await
    }

    /// Disables every module except `slug`.
    pub async fn disable_all_except(&self, slug: &str) -> AppResult<u64> {
        let changed = self.store.disable_all_except(slug).await?;
        debug!(kept = %slug, changed, "Disabled modules");
        Ok(changed)
    }

    /// Candidate module directories under `root`.
    pub async fn scan(&self, root: &Path) -> AppResult<Vec<ModuleDir>> {
        self.manifests.list_dirs(root).await
    }
}
