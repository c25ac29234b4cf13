//! Cache metadata header codec
//!
//! Every cache file begins with a 4-key JSON header carrying the HTTP
//! validators the content was fetched with:
//!
//! ```json
//! {"_url": "https://conda.anaconda.org/conda-forge/linux-64",
//!  "_etag": "W/\"6092e6a2b6cec6ea5aade4e177c3edda-8\"",
//!  "_mod": "Sat, 04 Apr 2020 03:29:49 GMT",
//!  "_cache_control": "public, max-age=1200"}
//! ```
//!
//! The header is spliced into the repodata document itself (the body's own
//! fields continue at the same nesting level), so reading it back must not
//! parse or even load the potentially very large body.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::warn;

/// Unescaped double quotes in a serialized header: 4 keys, and for each key
/// an opening/closing quote around the name and around the value.
const HEADER_QUOTES: usize = 16;

/// The cache-validation record prepended to every cache file.
///
/// Exactly these four keys; values are empty strings when the server did not
/// supply the corresponding validator. Field order here fixes the on-disk
/// key order; reads accept any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeader {
    #[serde(rename = "_url")]
    pub url: String,

    #[serde(rename = "_etag")]
    pub etag: String,

    #[serde(rename = "_mod")]
    pub last_modified: String,

    #[serde(rename = "_cache_control")]
    pub cache_control: String,
}

impl CacheHeader {
    /// Read the header back from the front of a cache file.
    ///
    /// Returns `None` for unreadable, truncated, or unrecognized files; the
    /// caller treats those as a stale cache.
    pub fn extract(path: &Path) -> Option<CacheHeader> {
        let file = File::open(path).ok()?;
        Self::extract_from_reader(BufReader::new(file))
    }

    /// Scan for the 16th unescaped quote, then parse the accumulated prefix.
    ///
    /// The escape flag is set by a backslash and cleared by the following
    /// byte, so `\"` never counts and `\\"` does.
    pub fn extract_from_reader<R: Read>(reader: R) -> Option<CacheHeader> {
        let mut prefix = Vec::new();
        let mut quotes = 0usize;
        let mut escaped = false;

        for byte in reader.bytes() {
            let b = byte.ok()?;
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                quotes += 1;
                if quotes == HEADER_QUOTES {
                    // Synthesize the closing sequence instead of scanning on.
                    prefix.extend_from_slice(b"\"}");
                    return match serde_json::from_slice(&prefix) {
                        Ok(header) => Some(header),
                        Err(err) => {
                            warn!("Could not parse cache metadata header: {err}");
                            None
                        }
                    };
                }
            }
            prefix.push(b);
        }

        // EOF before the full header: not a recognized cache file.
        None
    }

    /// Serialize the header with its closing brace replaced by a trailing
    /// comma, so the body's fields continue the same JSON object.
    fn open_prefix(&self) -> Result<String> {
        let mut prefix = serde_json::to_string(self)?;
        prefix.pop();
        prefix.push(',');
        Ok(prefix)
    }
}

/// Write a complete cache file: header prefix, then the repodata body with
/// its own opening brace stripped.
///
/// The body must itself be a JSON object; anything else is rejected up front
/// rather than spliced blindly.
pub fn write_cache_file<R: Read, W: Write>(
    header: &CacheHeader,
    body: R,
    mut out: W,
) -> Result<()> {
    let mut body = BufReader::new(body);
    let mut lead = [0u8; 1];
    body.read_exact(&mut lead)
        .map_err(|e| Error::io("reading repodata body", e))?;
    if lead[0] != b'{' {
        return Err(Error::MalformedRepodata);
    }

    out.write_all(header.open_prefix()?.as_bytes())
        .map_err(|e| Error::io("writing cache metadata header", e))?;
    std::io::copy(&mut body, &mut out).map_err(|e| Error::io("writing repodata body", e))?;
    Ok(())
}
