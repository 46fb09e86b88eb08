//! Manifest source trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::module::Manifest;

/// A candidate module directory found under an extensions root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDir {
    /// Directory name, used as the module slug.
    pub slug: String,
    /// Full path to the directory.
    pub path: PathBuf,
}

/// Reads module descriptors from module directories.
#[async_trait]
pub trait ManifestSource: Send + Sync + std::fmt::Debug + 'static {
    /// Read the manifest in `dir`. `Ok(None)` when the directory has no manifest.
    async fn read(&self, dir: &Path) -> AppResult<Option<Manifest>>;

    /// List the immediate sub-directories of `root`, sorted by name.
    async fn list_dirs(&self, root: &Path) -> AppResult<Vec<ModuleDir>>;
}
