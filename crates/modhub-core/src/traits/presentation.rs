//! Presentation layer trait.

use serde_json::Value;

use crate::result::AppResult;

/// Renders a named view with arguments.
///
/// Template rendering lives outside the runtime; the router only ever asks
/// for a view by name.
pub trait ViewRenderer: Send + Sync + std::fmt::Debug {
    /// Render `view` with `args` into a response body.
    fn render(&self, view: &str, args: &Value) -> AppResult<String>;
}
