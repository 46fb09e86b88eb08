//! CLI command definitions and dispatch.

pub mod dispatch;
pub mod maintenance;
pub mod modules;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use crate::runtime::Runtime;
use modhub_core::config::AppConfig;
use modhub_core::error::AppError;

/// ModHub: plugin-driven module runtime
#[derive(Debug, Parser)]
#[command(name = "modhub", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and the per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Route one request line and print the response
    Dispatch(dispatch::DispatchArgs),
    /// Module administration
    Modules(modules::ModulesArgs),
    /// Maintenance mode
    Maintenance(maintenance::MaintenanceArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        let runtime = Runtime::start(config).await?;
        let result = match &self.command {
            Commands::Dispatch(args) => dispatch::execute(args, &runtime, self.format).await,
            Commands::Modules(args) => modules::execute(args, &runtime, self.format).await,
            Commands::Maintenance(args) => maintenance::execute(args, &runtime).await,
        };
        runtime.shutdown().await;
        result
    }
}
