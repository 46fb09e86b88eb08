//! Unified application error types for modhub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] tag is what the
//! hook dispatcher and the router fallback chain switch on, so expected
//! outcomes (no route match, a contained participant failure) never have to
//! be told apart from real faults by inspecting messages.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A handler or hook receiver is missing or ambiguous. Fatal in the core tier.
    Configuration,
    /// An extension or application participant failed during a hook dispatch.
    ContainedFailure,
    /// A module dependency is missing or cannot be satisfied.
    Dependency,
    /// No route pattern matched the request.
    RouteNotFound,
    /// The matched handler does not implement the request method.
    UnsupportedMethod,
    /// A fallback redirect would target the route already being served.
    RedirectLoop,
    /// The requested record was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// The caller does not hold the required permission.
    Authorization,
    /// A database error occurred.
    Database,
    /// A filesystem or record-store I/O error occurred.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Returns whether this kind describes an expected outcome rather than a fault.
    ///
    /// Expected outcomes are reported to users through the normal fallback
    /// pages; faults additionally carry diagnostic detail in debug mode.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::ContainedFailure
                | Self::Dependency
                | Self::RouteNotFound
                | Self::UnsupportedMethod
                | Self::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::ContainedFailure => write!(f, "CONTAINED_FAILURE"),
            Self::Dependency => write!(f, "DEPENDENCY"),
            Self::RouteNotFound => write!(f, "ROUTE_NOT_FOUND"),
            Self::UnsupportedMethod => write!(f, "UNSUPPORTED_METHOD"),
            Self::RedirectLoop => write!(f, "REDIRECT_LOOP"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout modhub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a contained participant failure.
    pub fn contained(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContainedFailure, message)
    }

    /// Create a dependency error.
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dependency, message)
    }

    /// Create a route-not-found error.
    pub fn route_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RouteNotFound, message)
    }

    /// Create an unsupported-method error.
    pub fn unsupported_method(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedMethod, message)
    }

    /// Create a redirect-loop error.
    pub fn redirect_loop(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RedirectLoop, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
