//! Per-subdir cache entry state machine
//!
//! One `SubdirCache` per (channel, platform). `load()` consults the
//! freshness policy; a stale cache produces a conditional transfer whose
//! completed response is fed back through `finalize_transfer()`. Only the
//! finalize step ever replaces the real cache file, and it does so through
//! an atomic rename, so an interrupted run leaves at most a temp file
//! behind.

use crate::cache::freshness::{self, Freshness};
use crate::cache::header::{self, CacheHeader};
use crate::cache::{cache_fn_url, create_cache_dir};
use crate::config::CacheSettings;
use crate::error::{Error, Result};
use crate::fetch::{decompress, FetchRequest, TransferClass, TransferResponse, TransferState};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No usable result yet
    Unloaded,
    /// A conditional transfer is in flight
    AwaitingTransfer,
    /// A usable cache path is available
    Loaded,
    /// The last refresh attempt failed
    Failed,
}

/// Metadata handed to the solver collaborator when constructing a repo
/// from this entry's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub url: String,
    pub etag: String,
    pub last_modified: String,
}

/// Cache entry for one (channel, platform) subdir.
#[derive(Debug)]
pub struct SubdirCache {
    name: String,
    repodata_url: String,
    cache_dir: PathBuf,
    json_path: PathBuf,
    solv_path: PathBuf,
    is_critical: bool,
    state: EntryState,
    loaded: bool,
    download_complete: bool,
    json_cache_valid: bool,
    solv_cache_valid: bool,
    stored_header: Option<CacheHeader>,
    pending: Option<TransferState>,
}

impl SubdirCache {
    /// Create an entry for one subdir. `is_critical` marks the subdir whose
    /// absence aborts the whole load (conventionally the
    /// architecture-independent index); all others fail soft.
    pub fn new(
        name: impl Into<String>,
        repodata_url: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
        is_critical: bool,
    ) -> Self {
        let repodata_url = repodata_url.into();
        let cache_dir = cache_dir.into();
        let json_path = cache_dir.join(cache_fn_url(&repodata_url));
        let solv_path = json_path.with_extension("solv");

        Self {
            name: name.into(),
            repodata_url,
            cache_dir,
            json_path,
            solv_path,
            is_critical,
            state: EntryState::Unloaded,
            loaded: false,
            download_complete: false,
            json_cache_valid: false,
            solv_cache_valid: false,
            stored_header: None,
            pending: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.repodata_url
    }

    /// Whether a usable result is available. Deliberately separate from the
    /// `load()` return value; a skipped offline fetch returns `Ok(true)`
    /// while leaving this false.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Whether this run actually went to the source (200 body or a 304
    /// confirmation), as opposed to serving a still-fresh cache.
    pub fn download_complete(&self) -> bool {
        self.download_complete
    }

    pub fn is_critical(&self) -> bool {
        self.is_critical
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn solv_path(&self) -> &Path {
        &self.solv_path
    }

    /// Local filesystem sources are never cache-eligible.
    pub fn forbid_cache(&self) -> bool {
        self.repodata_url.starts_with("file://")
    }

    /// Evaluate cache freshness and, when stale, stage a conditional
    /// transfer (see `request()`).
    pub fn load(&mut self, settings: &CacheSettings, now: SystemTime) -> Result<bool> {
        let json_mtime = mtime(&self.json_path);
        self.stored_header = if json_mtime.is_some() {
            CacheHeader::extract(&self.json_path)
        } else {
            None
        };

        match freshness::evaluate(
            now,
            json_mtime,
            mtime(&self.solv_path),
            self.stored_header.as_ref(),
            settings,
            self.forbid_cache(),
        ) {
            Freshness::Fresh { solv_valid } => {
                info!("Using cache for {} ({})", self.name, self.repodata_url);
                self.json_cache_valid = true;
                self.solv_cache_valid = solv_valid;
                self.loaded = true;
                self.state = EntryState::Loaded;
            }
            Freshness::Stale => self.begin_transfer()?,
            Freshness::OfflineMiss => {
                debug!(
                    "No cache for {} and offline is set, skipping fetch",
                    self.repodata_url
                );
            }
        }
        Ok(true)
    }

    /// The conditional request awaiting a transport, if any.
    pub fn request(&self) -> Option<&FetchRequest> {
        self.pending.as_ref().map(|transfer| &transfer.request)
    }

    fn begin_transfer(&mut self) -> Result<()> {
        create_cache_dir(&self.cache_dir)?;
        let transfer = TransferState::new(
            &self.repodata_url,
            self.stored_header.as_ref(),
            &self.cache_dir,
            !self.is_critical,
        )?;
        debug!("Staged conditional transfer for {}", self.repodata_url);
        self.pending = Some(transfer);
        self.state = EntryState::AwaitingTransfer;
        Ok(())
    }

    /// Apply a completed transfer to this entry. Invoked exactly once per
    /// transfer staged by `load()`.
    ///
    /// Returns `Ok(false)` for a recoverable failure on a non-critical
    /// subdir; the entry stays unloaded and the caller proceeds without it.
    pub fn finalize_transfer(&mut self, response: TransferResponse) -> Result<bool> {
        let Some(transfer) = self.pending.take() else {
            warn!("No transfer in flight for {}", self.name);
            return Ok(false);
        };

        match response.classify() {
            TransferClass::Failed => {
                warn!(
                    "Unable to retrieve repodata (status {}, {:?}) for {}",
                    response.status, response.transport_error, self.repodata_url
                );
                self.loaded = false;
                self.state = EntryState::Failed;
                if self.is_critical {
                    Err(Error::CriticalFetch {
                        name: self.name.clone(),
                        url: self.repodata_url.clone(),
                        status: response.status,
                    })
                } else {
                    Ok(false)
                }
            }
            TransferClass::Protocol => {
                self.loaded = false;
                self.state = EntryState::Failed;
                Err(Error::Protocol {
                    url: self.repodata_url.clone(),
                    status: response.status,
                })
            }
            TransferClass::NotModified => {
                // transfer (and its temp file) dropped: 304 carries no body
                self.confirm_cache(SystemTime::now())?;
                Ok(true)
            }
            TransferClass::NewContent => {
                self.commit_new_content(transfer, &response, SystemTime::now())?;
                Ok(true)
            }
        }
    }

    /// HTTP 304: nothing to rewrite. Extend the freshness window by touching
    /// mtimes. Both ages are read before either touch, so the solv
    /// comparison is against the pre-refresh primary age.
    fn confirm_cache(&mut self, now: SystemTime) -> Result<()> {
        let json_age = mtime(&self.json_path).and_then(|m| now.duration_since(m).ok());
        let solv_age = mtime(&self.solv_path).and_then(|m| now.duration_since(m).ok());

        touch(&self.json_path, now)?;
        if let (Some(solv_age), Some(json_age)) = (solv_age, json_age) {
            if solv_age <= json_age {
                touch(&self.solv_path, now)?;
                self.solv_cache_valid = true;
            }
        }

        self.json_cache_valid = true;
        self.download_complete = true;
        self.loaded = true;
        self.state = EntryState::Loaded;
        info!("Cache confirmed current for {}", self.repodata_url);
        Ok(())
    }

    /// HTTP 200 (or a local-file read): decompress if needed, splice the new
    /// metadata header in front of the body, and atomically swap the result
    /// over the old cache file.
    fn commit_new_content(
        &mut self,
        transfer: TransferState,
        response: &TransferResponse,
        now: SystemTime,
    ) -> Result<()> {
        let mut temp = transfer.into_temp();
        if self.repodata_url.ends_with(".bz2") {
            temp = decompress::decompress_to_temp(temp.path(), &self.cache_dir)?;
        }

        let header = CacheHeader {
            url: self.repodata_url.clone(),
            etag: response.etag.clone().unwrap_or_default(),
            last_modified: response.last_modified.clone().unwrap_or_default(),
            cache_control: response.cache_control.clone().unwrap_or_default(),
        };

        let body =
            File::open(temp.path()).map_err(|e| Error::io("opening downloaded repodata", e))?;
        let mut staged = NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| Error::io("creating cache temp file", e))?;
        header::write_cache_file(&header, body, &mut staged)?;
        staged.persist(&self.json_path).map_err(|e| {
            Error::io(
                format!("replacing cache file {}", self.json_path.display()),
                e.error,
            )
        })?;
        // Base later freshness checks on our clock, not filesystem skew.
        touch(&self.json_path, now)?;

        self.stored_header = Some(header);
        self.json_cache_valid = true;
        // The derived cache now predates the fresh json and must be rebuilt.
        self.solv_cache_valid = false;
        self.download_complete = true;
        self.loaded = true;
        self.state = EntryState::Loaded;
        info!("Finalized transfer for {}", self.repodata_url);
        Ok(())
    }

    /// The path the solver should load: the derived solv cache when trusted,
    /// otherwise the JSON cache.
    pub fn cache_path(&self) -> Result<&Path> {
        // TODO invalidate the solv cache on solver format version bumps
        if self.json_cache_valid && self.solv_cache_valid {
            Ok(&self.solv_path)
        } else if self.json_cache_valid {
            Ok(&self.json_path)
        } else {
            Err(Error::CacheNotLoaded(self.name.clone()))
        }
    }

    /// Metadata for the solver collaborator constructing a repo from this
    /// entry's cache.
    pub fn repo_metadata(&self) -> RepoMetadata {
        let header = self.stored_header.clone().unwrap_or_default();
        RepoMetadata {
            url: self.repodata_url.clone(),
            etag: header.etag,
            last_modified: header.last_modified,
        }
    }

    /// Delete both cache files unconditionally.
    pub fn clear(&self) -> Result<()> {
        for path in [&self.json_path, &self.solv_path] {
            if path.exists() {
                fs::remove_file(path)
                    .map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
                debug!("Removed {}", path.display());
            }
        }
        Ok(())
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn touch(path: &Path, time: SystemTime) -> Result<()> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|file| file.set_modified(time))
        .map_err(|e| Error::io(format!("touching {}", path.display()), e))
}
