//! CLI command implementations

pub mod clear;
pub mod config;
pub mod fetch;

pub use clear::execute as clear;
pub use config::execute as config;
pub use fetch::execute as fetch;

use crate::config::{CacheSettings, ConfigManager};
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Repodata URL for one (channel, platform) subdir.
fn repodata_url(channel: &str, platform: &str, compressed: bool) -> String {
    let filename = if compressed {
        "repodata.json.bz2"
    } else {
        "repodata.json"
    };
    format!("{}/{}/{}", channel.trim_end_matches('/'), platform, filename)
}

/// Cache directory: CLI override, then config, then the platform default.
fn resolve_cache_dir(cli_override: Option<PathBuf>, settings: &CacheSettings) -> PathBuf {
    cli_override
        .or_else(|| settings.dir.clone())
        .unwrap_or_else(ConfigManager::cache_root)
        .join("cache")
}

fn validate_channel(channel: &str) -> Result<()> {
    if ["https://", "http://", "file://"]
        .iter()
        .any(|scheme| channel.starts_with(scheme))
    {
        Ok(())
    } else {
        Err(Error::InvalidUrl(channel.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repodata_url_joins_cleanly() {
        assert_eq!(
            repodata_url("https://example.org/channel/", "noarch", false),
            "https://example.org/channel/noarch/repodata.json"
        );
        assert_eq!(
            repodata_url("https://example.org/channel", "linux-64", true),
            "https://example.org/channel/linux-64/repodata.json.bz2"
        );
    }

    #[test]
    fn cache_dir_precedence() {
        let settings = CacheSettings {
            dir: Some(PathBuf::from("/from/config")),
            ..Default::default()
        };
        assert_eq!(
            resolve_cache_dir(Some(PathBuf::from("/from/cli")), &settings),
            PathBuf::from("/from/cli/cache")
        );
        assert_eq!(
            resolve_cache_dir(None, &settings),
            PathBuf::from("/from/config/cache")
        );
    }

    #[test]
    fn channel_scheme_is_validated() {
        assert!(validate_channel("https://example.org/channel").is_ok());
        assert!(validate_channel("file:///srv/channel").is_ok());
        assert!(validate_channel("ftp://example.org/channel").is_err());
        assert!(validate_channel("example.org/channel").is_err());
    }
}
