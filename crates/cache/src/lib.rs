//! # Cache — persistent snapshot of a compacted index
//!
//! Serializes the whole compacted translation index to one binary file and
//! reloads it, guaranteeing consistency with the source files through a
//! SHA-256 fingerprint.
//!
//! ## Frame layout
//!
//! ```text
//! [magic "I18NC": 5 bytes]
//! [version: u32 LE]            current = 1
//! [fingerprint: str]           SHA-256 hex over the source file list
//! [payload_len: u64 LE]
//! [crc32: u32 LE]              over the payload bytes
//! [payload]
//! ```
//!
//! Payload (in order): separator, schema keys (index order), value columns,
//! string arena, object table (rules written as placeholders), subtree child
//! index, rule-position map `{object index → [(locale, flat key)]}`.
//!
//! ## Failure policy
//!
//! The cache is advisory. Every load defect — missing file, bad magic,
//! wrong version, CRC or decode failure, fingerprint or separator mismatch,
//! out-of-range packed reference — is a **miss** (`None`), and the caller
//! compacts from scratch. Every save failure is swallowed after cleaning up
//! the temp file; the in-memory index keeps working.

pub mod fingerprint;
pub mod format;

mod reader;
mod writer;

pub use format::{Snapshot, MAGIC, VERSION};
pub use reader::{load, NoRules, RuleSource};
pub use writer::save;

use thiserror::Error;

/// Internal error type. Never escapes the crate boundary as an error: the
/// reader maps everything to a miss and the writer swallows everything.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad magic, wrong length prefix, undecodable field, CRC mismatch —
    /// anything that makes the frame untrustworthy.
    #[error("corrupt cache file: {0}")]
    Corrupt(&'static str),

    /// The frame is well-formed but written by an incompatible version.
    #[error("unsupported cache version {0}")]
    Version(u32),
}
