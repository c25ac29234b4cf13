//! Repocache - Repodata Cache-Coherency Engine
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use repocache::cli::{Cli, Commands};
use repocache::config::ConfigManager;
use repocache::error::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("repocache=warn"),
        1 => EnvFilter::new("repocache=info"),
        _ => EnvFilter::new("repocache=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    match cli.command {
        Commands::Fetch(args) => repocache::cli::commands::fetch(args, &config).await,
        Commands::Clear(args) => repocache::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            repocache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
