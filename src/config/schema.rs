//! Configuration schema for Repocache
//!
//! Configuration is stored at `~/.config/repocache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache freshness settings
    pub cache: CacheSettings,

    /// Network settings
    pub network: NetworkConfig,
}

/// Cache freshness settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Freshness policy for cached repodata:
    /// * `0` (or any negative value) - the server decides; expired caches
    ///   are always revalidated
    /// * `1` - honor the max-age the server sent with the cached copy
    /// * anything greater - override the server and keep caches fresh for
    ///   this many seconds
    pub local_repodata_ttl: i64,

    /// Never touch the network; present caches count as fresh regardless
    /// of age, absent ones are skipped
    pub offline: bool,

    /// Cache root override (defaults to the platform cache directory)
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            local_repodata_ttl: 1,
            offline: false,
            dir: None,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Global per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("repocache/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}
