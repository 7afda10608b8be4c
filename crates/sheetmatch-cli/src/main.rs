//! Sheetmatch CLI entry point.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use sheetmatch_cli::cli::{Args, Command};
use sheetmatch_cli::{commands, config_handlers};
use sheetmatch_core::SheetmatchConfig;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    // Logs go to stderr so `compare --output -` can stream CSV on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration, then start logging at its level.
fn load_config(config_path: Option<&str>, verbose: bool) -> Result<SheetmatchConfig> {
    let config = SheetmatchConfig::load(config_path)?;
    init_logging(verbose, &config.logging.level);
    tracing::debug!(config = ?config_path, "Configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command {
        Command::Config { action } => {
            init_logging(args.verbose, "warn");
            config_handlers::handle_config_command(config_path, action)?;
        }
        Command::Serve { host, port } => {
            let config = load_config(config_path, args.verbose)?;
            commands::serve(config, host, port).await?;
        }
        Command::Sheets { file, header_row } => {
            let config = load_config(config_path, args.verbose)?;
            commands::sheets(&config, &file, header_row)?;
        }
        Command::Compare(compare) => {
            let config = load_config(config_path, args.verbose)?;
            tokio::task::spawn_blocking(move || commands::compare(&config, &compare)).await??;
        }
    }
    Ok(())
}
