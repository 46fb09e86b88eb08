//! In-memory manifest source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use modhub_core::result::AppResult;
use modhub_core::traits::manifest::{ManifestSource, ModuleDir};
use modhub_core::types::module::Manifest;

/// Manifests registered programmatically by directory path.
///
/// Useful for embedding the runtime without a module tree on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryManifestSource {
    manifests: Arc<DashMap<PathBuf, Manifest>>,
}

impl MemoryManifestSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the manifest for `dir`.
    pub fn insert(&self, dir: impl Into<PathBuf>, manifest: Manifest) {
        self.manifests.insert(dir.into(), manifest);
    }

    /// Parses and registers a JSON manifest for `dir`.
    pub fn insert_json(&self, dir: impl Into<PathBuf>, json: &str) -> AppResult<()> {
        let manifest: Manifest = serde_json::from_str(json)?;
        self.insert(dir, manifest);
        Ok(())
    }

    /// Removes the manifest for `dir`, as if the module were deleted from disk.
    pub fn remove(&self, dir: &Path) -> bool {
        self.manifests.remove(dir).is_some()
    }
}

#[async_trait]
impl ManifestSource for MemoryManifestSource {
    async fn read(&self, dir: &Path) -> AppResult<Option<Manifest>> {
        Ok(self.manifests.get(dir).map(|m| m.value().clone()))
    }

    async fn list_dirs(&self, root: &Path) -> AppResult<Vec<ModuleDir>> {
        let mut dirs: Vec<ModuleDir> = self
            .manifests
            .iter()
            .filter(|entry| entry.key().parent() == Some(root))
            .filter_map(|entry| {
                let slug = entry.key().file_name()?.to_str()?.to_string();
                Some(ModuleDir {
                    slug,
                    path: entry.key().clone(),
                })
            })
            .collect();
        dirs.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_dirs_only_direct_children() {
        let source = MemoryManifestSource::new();
        source.insert("ext/files", Manifest::default());
        source.insert("ext/blog", Manifest::default());
        source.insert("app", Manifest::default());

        let dirs = source.list_dirs(Path::new("ext")).await.unwrap();
        let slugs: Vec<&str> = dirs.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["blog", "files"]);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let source = MemoryManifestSource::new();
        assert!(source.read(Path::new("nowhere")).await.unwrap().is_none());
    }
}
