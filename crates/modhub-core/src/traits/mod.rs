//! Collaborator traits defined in `modhub-core` and implemented by other crates.

pub mod manifest;
pub mod presentation;
pub mod store;
pub mod user;

pub use manifest::{ManifestSource, ModuleDir};
pub use presentation::ViewRenderer;
pub use store::{ModuleStore, SettingsStore};
pub use user::CurrentUser;
