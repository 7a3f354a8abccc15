//! Write-then-rename file replacement.
//!
//! Regenerated files are first written to a hidden temporary file in the
//! destination directory and then renamed over the target, so a concurrent
//! reader sees either the old content or the new content, never a prefix.
//! The temporary file is removed on every error path when it is dropped.
//!
//! A symlinked target is written through: the file the link points to is
//! replaced and the link itself stays in place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;

const TEMP_PREFIX: &str = ".bl4-";
const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replace `path` with `content`.
///
/// # Errors
///
/// Returns the underlying I/O error if the temporary file cannot be created,
/// written, flushed, or renamed into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let path = &resolve_link(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;

    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| e.error)?;
    log::trace!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Follow `path` to the file it names if it is a symlink.
fn resolve_link(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(path),
        _ => Ok(path.to_path_buf()),
    }
}
