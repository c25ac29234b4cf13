//! Streaming bzip2 decompression of transfer payloads
//!
//! Channels may serve `repodata.json.bz2`; the payload is streamed
//! block-by-block into a fresh temp file which then replaces the
//! coordinator's working temp file.

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const BLOCK_SIZE: usize = 16 * 1024;

/// Decompress `src` into a new temp file created in `dir`.
///
/// A decoder error mid-stream is a hard corrupt-stream failure, never a
/// silent truncation of the output.
pub fn decompress_to_temp(src: &Path, dir: &Path) -> Result<NamedTempFile> {
    debug!("Decompressing {}", src.display());

    let file =
        File::open(src).map_err(|e| Error::decompress(src, format!("open failed: {e}")))?;
    let mut decoder = BzDecoder::new(file);
    let mut out = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io("creating decompression temp file", e))?;

    let mut block = [0u8; BLOCK_SIZE];
    loop {
        let n = decoder
            .read(&mut block)
            .map_err(|e| Error::decompress(src, format!("corrupt stream: {e}")))?;
        if n == 0 {
            break;
        }
        out.write_all(&block[..n])
            .map_err(|e| Error::io("writing decompressed repodata", e))?;
    }

    Ok(out)
}
