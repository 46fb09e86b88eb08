//! Per-request runtime context.
//!
//! Everything a dispatch or a routing pass needs to know about its
//! surroundings (where modules live, which core version is running, whether
//! diagnostic mode is on) is gathered here once per request and passed
//! explicitly to the registry, dispatcher, and router.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use modhub_core::config::AppConfig;
use modhub_core::result::AppResult;
use modhub_core::traits::manifest::ManifestSource;
use modhub_core::traits::store::SettingsStore;
use modhub_core::types::version::Version;

/// Name of the persisted setting that overrides `site.debug`.
pub const DEBUG_SETTING: &str = "debug";

/// Name of the persisted maintenance flag.
pub const MAINTENANCE_SETTING: &str = "maintenance_mode";

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Something failed.
    Error,
    /// Something needs attention.
    Warning,
    /// Informational.
    Notice,
}

/// A message queued for display to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Message text.
    pub message: String,
}

/// Shared, append-only sink of user-visible notices for one request.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    inner: Arc<RwLock<Vec<Notice>>>,
}

impl Notices {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notice.
    pub async fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
        };
        debug!(level = ?notice.level, message = %notice.message, "Notice queued");
        self.inner.write().await.push(notice);
    }

    /// Queues an error notice.
    pub async fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message).await;
    }

    /// Queues a warning notice.
    pub async fn warning(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message).await;
    }

    /// Queues an informational notice.
    pub async fn notice(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Notice, message).await;
    }

    /// Returns a copy of every queued notice.
    pub async fn all(&self) -> Vec<Notice> {
        self.inner.read().await.clone()
    }

    /// Removes and returns every queued notice.
    pub async fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.write().await)
    }
}

/// Explicit, request-scoped runtime state.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// Version of the running core.
    pub core_version: Version,
    /// Namespace (and slug) of the core module.
    pub core_namespace: String,
    /// Directory of the core module.
    pub core_dir: PathBuf,
    /// Namespace (and slug) of the application module.
    pub app_namespace: String,
    /// Directory of the application module.
    pub app_dir: PathBuf,
    /// Directory whose sub-directories are extensions.
    pub ext_dir: PathBuf,
    /// Diagnostic mode.
    pub debug: bool,
    /// User-visible notices raised while serving the request.
    pub notices: Notices,
}

impl RuntimeContext {
    /// Builds a context from configuration alone.
    ///
    /// The core version is the configured override, or empty when none is
    /// configured. Use [`RuntimeContext::resolve`] to read it from the core
    /// manifest and honour persisted settings.
    pub fn from_config(config: &AppConfig) -> Self {
        let modules = &config.modules;
        Self {
            core_version: modules
                .core_version
                .as_deref()
                .map(Version::new)
                .unwrap_or_default(),
            core_namespace: modules.core_namespace.clone(),
            core_dir: modules.core_dir.clone(),
            app_namespace: modules.app_namespace.clone(),
            app_dir: modules.app_dir.clone(),
            ext_dir: modules.ext_dir.clone(),
            debug: config.site.debug,
            notices: Notices::new(),
        }
    }

    /// Builds a context for one request.
    ///
    /// The core version comes from the configured override or else the core
    /// module's manifest. The persisted `debug` setting wins over
    /// `site.debug` when present.
    pub async fn resolve(
        config: &AppConfig,
        manifests: &dyn ManifestSource,
        settings: &dyn SettingsStore,
    ) -> AppResult<Self> {
        let mut context = Self::from_config(config);

        if context.core_version.is_empty() {
            if let Some(manifest) = manifests.read(&context.core_dir).await? {
                context.core_version = manifest.version;
            }
        }

        if let Some(value) = settings.get(DEBUG_SETTING).await? {
            context.debug = value == "1";
        }

        debug!(
            core_version = %context.core_version,
            debug = context.debug,
            "Runtime context resolved"
        );

        Ok(context)
    }

    /// Directory of the extension with the given slug.
    pub fn extension_dir(&self, slug: &str) -> PathBuf {
        self.ext_dir.join(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modhub_store::{MemoryManifestSource, MemorySettingsStore};

    #[tokio::test]
    async fn test_resolve_reads_core_manifest_version() {
        let config = AppConfig::default();
        let manifests = MemoryManifestSource::new();
        manifests
            .insert_json(&config.modules.core_dir, r#"{"name":"Core","version":"3.1"}"#)
            .unwrap();
        let settings = MemorySettingsStore::new();

        let context = RuntimeContext::resolve(&config, &manifests, &settings)
            .await
            .unwrap();
        assert_eq!(context.core_version, Version::new("3.1"));
        assert!(!context.debug);
    }

    #[tokio::test]
    async fn test_persisted_debug_overrides_config() {
        let mut config = AppConfig::default();
        config.site.debug = true;
        config.modules.core_version = Some("2.0".into());
        let settings = MemorySettingsStore::with_values([(DEBUG_SETTING, "0")]);

        let context = RuntimeContext::resolve(&config, &MemoryManifestSource::new(), &settings)
            .await
            .unwrap();
        assert!(!context.debug);
        assert_eq!(context.core_version.as_str(), "2.0");
    }

    #[tokio::test]
    async fn test_notices_drain() {
        let notices = Notices::new();
        notices.error("broken").await;
        notices.notice("done").await;
        assert_eq!(notices.all().await.len(), 2);

        let drained = notices.drain().await;
        assert_eq!(drained[0].level, NoticeLevel::Error);
        assert!(notices.all().await.is_empty());
    }
}
