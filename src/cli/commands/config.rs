//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::Result;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> Result<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            let toml = toml::to_string_pretty(config)?;
            println!("{toml}");
        }
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
    }

    Ok(())
}
