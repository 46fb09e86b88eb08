//! ModHub: plugin-driven module runtime
//!
//! Command-line entry point that wires the runtime crates together and
//! serves one request line or one administrative action per invocation.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use modhub_core::config::AppConfig;
use modhub_core::error::AppError;

mod commands;
mod output;
mod runtime;
mod site;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli.config_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(config).await {
        tracing::error!(kind = %e.kind, "Command failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from the config directory and environment
fn load_configuration(config_dir: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("MODHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load_from(config_dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
