//! Hook names and the hook contract.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use modhub_core::types::module::Module;

/// Every hook the runtime knows about, plus arbitrary named hooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookName {
    /// Collects the normal route table.
    Route,
    /// Collects the route table used while in maintenance mode.
    MaintenanceRoute,
    /// Picks the catch-all controller used while in maintenance mode.
    MaintenanceController,
    /// Fired before the router boots.
    PreBoot,
    /// Fired after the route table is known and before matching.
    PostBoot,
    /// Collects library files each module wants loaded.
    Libraries,
    /// Runs install routines of modules with an update pending.
    Install,
    /// Runs uninstall routines.
    Uninstall,
    /// Collects permission names declared by modules.
    Permission,
    /// Collects administrative control links.
    Controls,
    /// Periodic maintenance tasks.
    Cron,
    /// A hook defined by a module or the application.
    Custom(String),
}

impl HookName {
    /// Returns the string name of this hook.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Route => "route",
            Self::MaintenanceRoute => "maintenance_route",
            Self::MaintenanceController => "maintenance_controller",
            Self::PreBoot => "pre_boot",
            Self::PostBoot => "post_boot",
            Self::Libraries => "libraries",
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Permission => "permission",
            Self::Controls => "controls",
            Self::Cron => "cron",
            Self::Custom(name) => name,
        }
    }

    /// Parses a hook name, falling back to [`HookName::Custom`].
    pub fn parse(name: &str) -> Self {
        match name {
            "route" => Self::Route,
            "maintenance_route" => Self::MaintenanceRoute,
            "maintenance_controller" => Self::MaintenanceController,
            "pre_boot" => Self::PreBoot,
            "post_boot" => Self::PostBoot,
            "libraries" => Self::Libraries,
            "install" => Self::Install,
            "uninstall" => Self::Uninstall,
            "permission" => Self::Permission,
            "controls" => Self::Controls,
            "cron" => Self::Cron,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for HookName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named operation dispatched across modules.
///
/// The dispatcher threads [`Hook::State`] through every participant in tier
/// order. `process` must only depend on the previous state and the current
/// participant's result.
pub trait Hook: Send + Sync {
    /// Accumulator threaded through participants.
    type State: Send;
    /// Value handed back to the caller after all participants ran.
    type Output;

    /// Name used to select the receiver method.
    fn name(&self) -> HookName;

    /// State before the first participant.
    fn initial_state(&self) -> Self::State;

    /// Decides whether `module` participates. The core tier passes `None`.
    fn pre_process(&self, _module: Option<&Module>) -> bool {
        true
    }

    /// Payload handed to every receiver.
    fn params(&self) -> Value {
        Value::Null
    }

    /// Folds one participant's result into the state.
    fn process(
        &self,
        result: Value,
        module_path: &Path,
        namespace: &str,
        module: Option<&Module>,
        state: Self::State,
    ) -> Self::State;

    /// Finalizes the state. Called exactly once per dispatch.
    fn post_process(&self, state: Self::State) -> Self::Output;
}
