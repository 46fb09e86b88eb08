//! Router output.

use serde::Serialize;

/// What the transport should send back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// A rendered page.
    Page {
        /// HTTP status code.
        status: u16,
        /// Rendered body.
        body: String,
    },
    /// A redirect to another location.
    Redirect {
        /// Target location.
        location: String,
    },
}

impl Response {
    /// A `200` page.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::page(200, body)
    }

    /// A page with an explicit status.
    pub fn page(status: u16, body: impl Into<String>) -> Self {
        Self::Page {
            status,
            body: body.into(),
        }
    }

    /// A redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    /// HTTP status code of this response.
    pub fn status(&self) -> u16 {
        match self {
            Self::Page { status, .. } => *status,
            Self::Redirect { .. } => 302,
        }
    }

    /// Page body, if this is a page.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Page { body, .. } => Some(body),
            Self::Redirect { .. } => None,
        }
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location } => Some(location),
            Self::Page { .. } => None,
        }
    }
}
