//! # modhub-core
//!
//! Core crate for the modhub runtime. Contains the module data model,
//! version ordering, configuration schemas, the traits through which the
//! runtime talks to its external collaborators (record store, settings,
//! manifests, presentation, current user), and the unified error system.
//!
//! This crate has **no** internal dependencies on other modhub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
