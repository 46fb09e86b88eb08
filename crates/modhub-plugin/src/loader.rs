//! Filesystem manifest loader.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use modhub_core::error::{AppError, ErrorKind};
use modhub_core::result::AppResult;
use modhub_core::traits::manifest::{ManifestSource, ModuleDir};
use modhub_core::types::module::Manifest;

/// File name of the module descriptor inside each module directory.
pub const MANIFEST_FILE: &str = "module.json";

/// Reads `module.json` descriptors from module directories on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestSource;

impl FsManifestSource {
    /// Creates a new filesystem manifest source.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ManifestSource for FsManifestSource {
    async fn read(&self, dir: &Path) -> AppResult<Option<Manifest>> {
        let file = dir.join(MANIFEST_FILE);
        let raw = match tokio::fs::read_to_string(&file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!(path = %file.display(), "No module manifest");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let manifest = serde_json::from_str(&raw).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Invalid module manifest '{}': {e}", file.display()),
                e,
            )
        })?;
        Ok(Some(manifest))
    }

    async fn list_dirs(&self, root: &Path) -> AppResult<Vec<ModuleDir>> {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                warn!(path = %root.display(), "Module directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(slug) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 module directory");
                continue;
            };
            if slug.starts_with('.') {
                continue;
            }
            dirs.push(ModuleDir {
                slug,
                path: entry.path(),
            });
        }

        dirs.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(dirs)
    }
}
