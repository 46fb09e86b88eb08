//! # modhub-plugin
//!
//! Module runtime for modhub. Provides:
//!
//! - Per-request runtime context with a user-visible notice sink
//! - Filesystem manifest loading
//! - The module registry (discovery, enabled listing, reconciliation)
//! - The dependency resolver with per-module rollback
//! - The three-tier hook dispatcher (core, enabled extensions, application)
//! - Built-in hooks and the module administration workflow

pub mod admin;
pub mod context;
pub mod hooks;
pub mod loader;
pub mod registry;
pub mod resolver;

pub use admin::{Inventory, ModuleAdmin, ModuleStatus, SelectionReport};
pub use context::{Notice, NoticeLevel, Notices, RuntimeContext};
pub use hooks::definitions::{Hook, HookName};
pub use hooks::dispatcher::{HookDispatcher, Participant};
pub use hooks::receiver::{HookReceiver, ReceiverRegistry};
pub use loader::{FsManifestSource, MANIFEST_FILE};
pub use registry::ModuleRegistry;
pub use resolver::{BatchReport, DependencyResolver, EnableOutcome};
