//! Conditional transfer coordination
//!
//! Builds conditional requests from stored cache validators, owns the
//! in-flight temp file a transfer lands in, classifies completed transfers,
//! and drives a whole set of entries through one refresh pass.

pub mod decompress;
pub mod transport;

pub use transport::{Transport, UreqTransport};

use crate::cache::header::CacheHeader;
use crate::cache::SubdirCache;
use crate::config::CacheSettings;
use crate::error::Result;
use futures_util::future;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::debug;

/// Status transports report for successful local-file reads.
pub const STATUS_LOCAL_FILE: u16 = 0;

/// A conditional download request handed to the transport.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL
    pub url: String,
    /// `If-None-Match` value from the stored header, if any
    pub if_none_match: Option<String>,
    /// `If-Modified-Since` value from the stored header, if any
    pub if_modified_since: Option<String>,
    /// Destination file the transport streams the body into
    pub dest: PathBuf,
    /// Report non-2xx statuses instead of treating them as fatal
    pub ignore_failure: bool,
}

impl FetchRequest {
    /// Build a conditional request from previously stored validators.
    /// Empty validators are omitted, producing an unconditional request.
    pub fn conditional(
        url: &str,
        header: Option<&CacheHeader>,
        dest: PathBuf,
        ignore_failure: bool,
    ) -> Self {
        Self {
            url: url.to_string(),
            if_none_match: header
                .map(|h| h.etag.clone())
                .filter(|etag| !etag.is_empty()),
            if_modified_since: header
                .map(|h| h.last_modified.clone())
                .filter(|modified| !modified.is_empty()),
            dest,
            ignore_failure,
        }
    }
}

/// Completed-transfer report, delivered by the transport exactly once.
#[derive(Debug, Clone, Default)]
pub struct TransferResponse {
    /// HTTP status; 0 for local-file reads
    pub status: u16,
    /// Transport-level failure (DNS, TLS, socket, local IO), if any
    pub transport_error: Option<String>,
    /// Response validators, stored into the new cache header
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub cache_control: Option<String>,
}

/// What a completed transfer means for the cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferClass {
    /// A fresh body was received (HTTP 200, or a local-file read)
    NewContent,
    /// HTTP 304: the cached content is still current
    NotModified,
    /// Transport failure or HTTP >= 400
    Failed,
    /// A status outside the expected server contract; never retried silently
    Protocol,
}

impl TransferResponse {
    pub fn classify(&self) -> TransferClass {
        if self.transport_error.is_some() || self.status >= 400 {
            return TransferClass::Failed;
        }
        match self.status {
            STATUS_LOCAL_FILE | 200 => TransferClass::NewContent,
            304 => TransferClass::NotModified,
            _ => TransferClass::Protocol,
        }
    }
}

/// In-flight transfer state: the request plus the scoped temp file the body
/// lands in. Dropping it (any path except a successful commit) removes the
/// temp file, so an interrupted transfer never leaves a partial cache.
#[derive(Debug)]
pub struct TransferState {
    pub request: FetchRequest,
    temp: NamedTempFile,
}

impl TransferState {
    pub fn new(
        url: &str,
        header: Option<&CacheHeader>,
        cache_dir: &Path,
        ignore_failure: bool,
    ) -> Result<Self> {
        let temp = NamedTempFile::new_in(cache_dir)
            .map_err(|e| crate::Error::io("creating transfer temp file", e))?;
        let request =
            FetchRequest::conditional(url, header, temp.path().to_path_buf(), ignore_failure);
        Ok(Self { request, temp })
    }

    pub(crate) fn into_temp(self) -> NamedTempFile {
        self.temp
    }
}

/// Load every entry and run all pending transfers to completion.
///
/// Transfers run concurrently; each entry is finalized exactly once, on this
/// task, in a fixed order. A failing non-critical entry is skipped (it stays
/// unloaded); a failing critical entry or a protocol violation aborts the
/// pass.
pub async fn refresh_all<T: Transport + ?Sized>(
    entries: &mut [SubdirCache],
    transport: &T,
    settings: &CacheSettings,
) -> Result<()> {
    let now = SystemTime::now();
    for entry in entries.iter_mut() {
        entry.load(settings, now)?;
    }

    let mut pending = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Some(request) = entry.request() {
            pending.push((index, request.clone()));
        }
    }
    if pending.is_empty() {
        debug!("All caches fresh, nothing to fetch");
        return Ok(());
    }

    let responses =
        future::join_all(pending.iter().map(|(_, request)| transport.fetch(request))).await;

    for ((index, _), response) in pending.into_iter().zip(responses) {
        entries[index].finalize_transfer(response)?;
    }
    Ok(())
}
