//! Module administration commands.

use clap::{Args, Subcommand};

use modhub_core::error::AppError;

use crate::output::{self, OutputFormat};
use crate::runtime::Runtime;

/// Arguments for `modules`
#[derive(Debug, Args)]
pub struct ModulesArgs {
    /// Module subcommand
    #[command(subcommand)]
    pub command: ModulesCommand,
}

/// Module subcommands
#[derive(Debug, Subcommand)]
pub enum ModulesCommand {
    /// Discover modules and show their state
    List,
    /// Enable exactly the given extensions, disabling all others
    Enable {
        /// Extension slugs
        #[arg(required = true)]
        slugs: Vec<String>,
    },
    /// Run a module's uninstall routine
    Uninstall {
        /// Extension slug
        slug: String,
    },
    /// Show administrative controls of enabled modules
    Controls,
}

/// Execute a `modules` subcommand
pub async fn execute(
    args: &ModulesArgs,
    runtime: &Runtime,
    format: OutputFormat,
) -> Result<(), AppError> {
    let admin = runtime.admin();

    match &args.command {
        ModulesCommand::List => {
            let inventory = admin.inventory().await?;
            output::print_item(&inventory, format);
        }
        ModulesCommand::Enable { slugs } => {
            admin.inventory().await?;
            let report = admin.apply_selection(slugs).await?;
            output::print_item(&report, format);
            let enabled: Vec<&str> = report.batch.enabled().collect();
            output::print_success(&format!("Enabled: {}", enabled.join(", ")));
        }
        ModulesCommand::Uninstall { slug } => {
            admin.inventory().await?;
            if admin.uninstall(slug).await? {
                output::print_success(&format!("Uninstalled {slug}"));
            } else {
                output::print_warning(&format!("{slug} was not uninstalled"));
            }
        }
        ModulesCommand::Controls => {
            let controls = admin.controls().await?;
            output::print_item(&controls, format);
        }
    }

    output::print_notices(&runtime.context().notices.drain().await);
    Ok(())
}
