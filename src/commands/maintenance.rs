//! Maintenance mode switch.

use clap::{Args, ValueEnum};

use modhub_core::error::AppError;
use modhub_core::traits::store::SettingsStore;
use modhub_plugin::context::MAINTENANCE_SETTING;

use crate::output;
use crate::runtime::Runtime;

/// Target state
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    /// Serve the maintenance route table
    On,
    /// Serve the normal route table
    Off,
    /// Print the current state
    Status,
}

/// Arguments for `maintenance`
#[derive(Debug, Args)]
pub struct MaintenanceArgs {
    /// Target state
    #[arg(value_enum)]
    pub switch: Switch,
}

/// Execute `maintenance`
pub async fn execute(args: &MaintenanceArgs, runtime: &Runtime) -> Result<(), AppError> {
    let settings = runtime.settings();
    match args.switch {
        Switch::On => {
            settings.set(MAINTENANCE_SETTING, Some("1")).await?;
            output::print_success("Maintenance mode on");
        }
        Switch::Off => {
            settings.set(MAINTENANCE_SETTING, Some("0")).await?;
            output::print_success("Maintenance mode off");
        }
        Switch::Status => {
            let on = settings.flag(MAINTENANCE_SETTING).await?;
            println!("maintenance: {}", if on { "on" } else { "off" });
        }
    }
    Ok(())
}
