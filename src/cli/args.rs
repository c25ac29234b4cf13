//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Repocache - Repodata Cache-Coherency Engine
///
/// Keeps per-subdir package index caches coherent with their channels
/// using conditional HTTP and mtime-based freshness.
#[derive(Parser, Debug)]
#[command(name = "repocache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REPOCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh the repodata caches for a channel
    Fetch(FetchArgs),

    /// Remove the cached repodata for a channel
    Clear(ClearArgs),

    /// Show or inspect configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Channel base URL (https://, http:// or file://)
    pub channel: String,

    /// Platform subdirs to refresh (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "noarch")]
    pub platform: Vec<String>,

    /// Cache directory override
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Freshness override in seconds (0 = server decides, 1 = honor
    /// server max-age)
    #[arg(long)]
    pub ttl: Option<i64>,

    /// Never touch the network; use whatever is cached
    #[arg(long)]
    pub offline: bool,

    /// Request bzip2-compressed repodata
    #[arg(long)]
    pub compressed: bool,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Channel base URL
    pub channel: String,

    /// Platform subdirs to clear (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "noarch")]
    pub platform: Vec<String>,

    /// Cache directory override
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
