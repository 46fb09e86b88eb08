//! Core type definitions used across the modhub workspace.

pub mod module;
pub mod version;

pub use module::{Dependency, Manifest, Module, ModuleFilter};
pub use version::Version;
