//! # modhub-store
//!
//! In-process implementations of the modhub collaborator stores:
//!
//! - [`MemoryModuleStore`]: module records in insertion order
//! - [`MemorySettingsStore`]: named system settings backed by `dashmap`
//! - [`MemoryManifestSource`]: manifests registered by directory path
//!
//! These back the CLI when no database is configured and are what the
//! runtime's own tests run against.

pub mod memory;

pub use memory::manifests::MemoryManifestSource;
pub use memory::modules::MemoryModuleStore;
pub use memory::settings::MemorySettingsStore;
