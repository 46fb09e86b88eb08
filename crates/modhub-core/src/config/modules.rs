//! Module location configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the core, the extensions, and the application live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Namespace (and slug) of the core module.
    #[serde(default = "default_core_namespace")]
    pub core_namespace: String,
    /// Directory holding the core module manifest.
    #[serde(default = "default_core_dir")]
    pub core_dir: PathBuf,
    /// Overrides the core version read from the core manifest.
    #[serde(default)]
    pub core_version: Option<String>,
    /// Namespace (and slug) of the application module.
    #[serde(default = "default_app_namespace")]
    pub app_namespace: String,
    /// Directory holding the application module.
    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,
    /// Directory whose sub-directories are extension modules.
    #[serde(default = "default_ext_dir")]
    pub ext_dir: PathBuf,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            core_namespace: default_core_namespace(),
            core_dir: default_core_dir(),
            core_version: None,
            app_namespace: default_app_namespace(),
            app_dir: default_app_dir(),
            ext_dir: default_ext_dir(),
        }
    }
}

fn default_core_namespace() -> String {
    "core".to_string()
}

fn default_core_dir() -> PathBuf {
    PathBuf::from("./core")
}

fn default_app_namespace() -> String {
    "app".to_string()
}

fn default_app_dir() -> PathBuf {
    PathBuf::from("./app")
}

fn default_ext_dir() -> PathBuf {
    PathBuf::from("./extensions")
}
