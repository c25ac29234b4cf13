//! Per-subdir repodata caching
//!
//! One cache entry per (channel, platform) pair. Each entry owns two files
//! under a shared cache directory: the spliced JSON repodata (`<stem>.json`)
//! and an optional derived solver cache (`<stem>.solv`) that is trusted only
//! while it is at least as recent as its JSON source.
//!
//! # Coherency model
//!
//! | On disk | Decision |
//! |---------|----------|
//! | No json file | fetch (or skip entirely when offline) |
//! | json within freshness window | use cache, no network |
//! | json expired | conditional fetch with stored ETag / Last-Modified |
//! | solv newer-or-equal to json | solver loads the solv file instead |

pub mod entry;
pub mod freshness;
pub mod header;

pub use entry::{EntryState, RepoMetadata, SubdirCache};
pub use freshness::Freshness;
pub use header::CacheHeader;

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Derive the deterministic cache file stem for a repodata URL.
pub fn cache_name_from_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..4])
}

/// Cache file name (`<stem>.json`) for a repodata URL.
pub fn cache_fn_url(url: &str) -> String {
    format!("{}.json", cache_name_from_url(url))
}

/// Create the shared cache directory, group-writable so several users of
/// one package-cache root can refresh it. The mode is applied only when
/// the directory is first created; an existing directory keeps whatever
/// mode the operator set.
pub fn create_cache_dir(cache_dir: &Path) -> Result<()> {
    if cache_dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(cache_dir).map_err(|e| {
        Error::io(
            format!("creating cache directory {}", cache_dir.display()),
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o2775);
        fs::set_permissions(cache_dir, perms)
            .map_err(|e| Error::io("setting cache directory permissions", e))?;
    }

    Ok(())
}
