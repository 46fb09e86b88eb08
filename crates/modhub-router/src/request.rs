//! Per-request context derived from the request line.

use serde::Serialize;

use modhub_core::config::RoutingConfig;

use crate::controller::HttpMethod;

/// The request line, split and classified once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    /// Request method.
    pub method: HttpMethod,
    /// Portion of the URI before `?`.
    pub path: String,
    /// Remainder of the URI including the `?`, or empty.
    pub query: String,
    /// The path starts with the process prefix.
    pub is_process: bool,
    /// The path starts with the backend prefix.
    pub is_backend: bool,
}

impl RequestContext {
    /// Splits `uri` and classifies it against the reserved prefixes.
    pub fn parse(method: HttpMethod, uri: &str, routing: &RoutingConfig) -> Self {
        let (path, query) = match uri.find('?') {
            Some(at) => (&uri[..at], &uri[at..]),
            None => (uri, ""),
        };
        Self {
            method,
            is_process: path.starts_with(&routing.process_prefix),
            is_backend: path.starts_with(&routing.backend_prefix),
            path: path.to_string(),
            query: query.to_string(),
        }
    }

    /// Whether `uri` addresses the current page.
    ///
    /// Slashes at either end are ignored. Unless `exact`, a parent path of
    /// the current page also counts as active.
    pub fn is_active_url(&self, uri: &str, exact: bool) -> bool {
        let uri = uri.trim_matches('/');
        let path = self.path.trim_matches('/');
        let full = format!("{}{}", self.path, self.query);
        if uri == path || uri == full.trim_matches('/') {
            return true;
        }
        if exact {
            return false;
        }

        let mut parts: Vec<&str> = path.split('/').collect();
        while !parts.is_empty() {
            if uri == parts.join("/") {
                return true;
            }
            parts.pop();
        }
        false
    }

    /// Absolute URL of the current page under `site_url`.
    pub fn page_url(&self, site_url: &str) -> String {
        format!(
            "{}/{}{}",
            site_url.trim_end_matches('/'),
            self.path.trim_start_matches('/'),
            self.query
        )
    }
}
