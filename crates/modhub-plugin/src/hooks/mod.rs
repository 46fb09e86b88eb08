//! Hook system: hook contract, receivers, the three-tier dispatcher, and built-in hooks.

pub mod builtin;
pub mod definitions;
pub mod dispatcher;
pub mod receiver;

pub use builtin::{
    BootHook, ControlsHook, CronHook, InstallHook, LibrariesHook, MaintenanceControllerHook,
    NamedHook, PermissionHook, RouteHook, RouteMap, UninstallHook,
};
pub use definitions::{Hook, HookName};
pub use dispatcher::{HookDispatcher, Participant};
pub use receiver::{HookReceiver, ReceiverRegistry};
