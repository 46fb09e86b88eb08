//! Request classification configuration.

use serde::{Deserialize, Serialize};

/// Reserved path prefixes used to classify incoming requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Paths starting with this prefix are process (API) requests.
    #[serde(default = "default_process_prefix")]
    pub process_prefix: String,
    /// Paths starting with this prefix are backend (administration) requests.
    #[serde(default = "default_backend_prefix")]
    pub backend_prefix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            process_prefix: default_process_prefix(),
            backend_prefix: default_backend_prefix(),
        }
    }
}

fn default_process_prefix() -> String {
    "/!/".to_string()
}

fn default_backend_prefix() -> String {
    "/admin".to_string()
}
