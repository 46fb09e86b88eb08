//! Site-wide configuration.

use serde::{Deserialize, Serialize};

/// Site-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Default diagnostic mode. The persisted `debug` system setting wins when present.
    #[serde(default)]
    pub debug: bool,
    /// Public base URL of the site, used to build absolute page URLs.
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            debug: false,
            site_url: default_site_url(),
        }
    }
}

fn default_site_url() -> String {
    "http://localhost".to_string()
}
