//! Plain-text view renderer.

use serde_json::Value;

use modhub_core::result::AppResult;
use modhub_core::traits::presentation::ViewRenderer;

/// Renders a view as its name followed by its arguments as pretty JSON.
///
/// Stands in for a template engine in the CLI and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl ViewRenderer for TextRenderer {
    fn render(&self, view: &str, args: &Value) -> AppResult<String> {
        if args.is_null() {
            return Ok(format!("[{view}]"));
        }
        Ok(format!("[{view}]\n{}", serde_json::to_string_pretty(args)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let body = TextRenderer.render("404.html", &json!({"path": "/x"})).unwrap();
        assert!(body.starts_with("[404.html]\n"));
        assert!(body.contains("\"path\": \"/x\""));
        assert_eq!(TextRenderer.render("500.html", &Value::Null).unwrap(), "[500.html]");
    }
}
