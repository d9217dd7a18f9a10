//! Atomic cache writes.

use crate::format::{self, Snapshot};
use crate::CacheError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persists a snapshot to `path` via `<path>.<pid>.tmp` + atomic rename.
///
/// Failures never propagate: a read-only cache directory, a full disk, or a
/// bad path all degrade to "no cache file" — the in-memory index is
/// unaffected. The temp file is unlinked on any failure.
pub fn save(snapshot: &Snapshot, path: &Path) {
    let tmp = tmp_path(path);
    if let Err(e) = try_save(snapshot, &tmp, path) {
        tracing::warn!(path = %path.display(), error = %e, "cache write skipped");
        let _ = fs::remove_file(&tmp);
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.{}.tmp", path.display(), std::process::id()))
}

fn try_save(snapshot: &Snapshot, tmp: &Path, path: &Path) -> Result<(), CacheError> {
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp)?;
        format::write_frame(&mut file, snapshot)?;
        file.flush()?;
        file.sync_all()?;
    }

    fs::rename(tmp, path)?;
    Ok(())
}
