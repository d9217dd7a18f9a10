//! Source-file fingerprints.
//!
//! The fingerprint ties a cache file to the exact state of the source files
//! the framework will load. Two modes:
//!
//! - **Mtime** (default): SHA-256 of the concatenation of
//!   `"<path>:<mtime_seconds>"` lines joined by `\n`. Fast — one `stat` per
//!   file.
//! - **Digest**: SHA-256 updated with `path`, `\0`, file contents, `\0` per
//!   file. Robust against touch-based redeploys that rewrite identical
//!   content with fresh mtimes.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Fingerprint mode. `Digest` is opt-in via the `cache_digest` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Mtime,
    Digest,
}

/// Computes the fingerprint over `paths`, in the given order.
///
/// # Errors
///
/// Fails if a path cannot be stat'ed (mtime mode) or read (digest mode).
/// Callers treat that as "caching unavailable for this build", not as a
/// fatal condition.
pub fn fingerprint<P: AsRef<Path>>(paths: &[P], mode: Mode) -> io::Result<String> {
    let mut hasher = Sha256::new();

    match mode {
        Mode::Mtime => {
            let mut lines = Vec::with_capacity(paths.len());
            for path in paths {
                let path = path.as_ref();
                let mtime = fs::metadata(path)?
                    .modified()?
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                    .as_secs();
                lines.push(format!("{}:{}", path.display(), mtime));
            }
            hasher.update(lines.join("\n").as_bytes());
        }
        Mode::Digest => {
            for path in paths {
                let path = path.as_ref();
                hasher.update(path.to_string_lossy().as_bytes());
                hasher.update([0u8]);
                hasher.update(&fs::read(path)?);
                hasher.update([0u8]);
            }
        }
    }

    Ok(to_hex(hasher.finalize().as_slice()))
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
