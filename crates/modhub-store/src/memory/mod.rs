//! In-memory store implementations.

pub mod manifests;
pub mod modules;
pub mod settings;
