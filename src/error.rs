//! Error types for repocache
//!
//! All modules use `Result<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repocache operations
pub type Result<T> = std::result::Result<T, Error>;

/// All errors that can occur in repocache
#[derive(Error, Debug)]
pub enum Error {
    // Cache state errors
    #[error("Cache not loaded for subdir '{0}'. Call load() and complete the transfer first.")]
    CacheNotLoaded(String),

    #[error("Failed to retrieve repodata for required subdir '{name}' from {url} (HTTP {status})")]
    CriticalFetch {
        name: String,
        url: String,
        status: u16,
    },

    #[error("Unexpected HTTP status {status} from {url}")]
    Protocol { url: String, status: u16 },

    #[error("Repodata body is not a JSON object (expected leading '{{')")]
    MalformedRepodata,

    // Decompression errors
    #[error("Failed to decompress {path}: {reason}")]
    Decompress { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid channel URL: {0}")]
    InvalidUrl(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a decompression error
    pub fn decompress(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decompress {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CriticalFetch { .. } => {
                Some("Check the channel URL, or pass --offline to use an existing cache")
            }
            Self::InvalidUrl(_) => Some("Channel URLs must start with http://, https:// or file://"),
            _ => None,
        }
    }
}
