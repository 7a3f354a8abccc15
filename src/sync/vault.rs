//! Quarantine for unreadable save files.
//!
//! When a binary save cannot be decoded, a byte-identical copy is stored in
//! `<folder>/bl4_auto_crypter errors/<sha1>.sav.b4ac`. Backups are keyed by
//! content, so re-syncing the same corrupt bytes never produces a second
//! copy. The offending file itself is never touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha1::{Digest, Sha1};

use super::atomic::write_atomic;

/// Name of the quarantine folder created inside a synced folder.
pub const ERRORS_DIR_NAME: &str = "bl4_auto_crypter errors";

/// Suffix appended to the content hash of each backup.
pub const BACKUP_SUFFIX: &str = ".sav.b4ac";

/// Errors that can occur while quarantining a file.
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    /// An I/O error occurred creating the folder or writing the backup.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Outcome of a quarantine request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "backup", rename_all = "snake_case")]
pub enum Quarantined {
    /// A new backup was written.
    Created(PathBuf),
    /// A backup of identical content already existed.
    AlreadyPresent(PathBuf),
}

impl Quarantined {
    /// Path of the backup file.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::AlreadyPresent(p) => p,
        }
    }
}

/// Stores backups of undecodable files.
#[derive(Debug, Clone, Default)]
pub struct ErrorVault {
    _private: (),
}

impl ErrorVault {
    /// Create a vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding backups for `folder`.
    #[must_use]
    pub fn errors_dir(folder: &Path) -> PathBuf {
        folder.join(ERRORS_DIR_NAME)
    }

    /// Backup file name for the given content.
    #[must_use]
    pub fn backup_name(raw: &[u8]) -> String {
        format!("{:x}{}", Sha1::digest(raw), BACKUP_SUFFIX)
    }

    /// Preserve a copy of `raw`, read from `binary_path`, under `folder`.
    ///
    /// The write is skipped when a backup with the same content hash already
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if the folder cannot be created or the
    /// backup cannot be written.
    pub fn quarantine(
        &self,
        folder: &Path,
        binary_path: &Path,
        raw: &[u8],
    ) -> Result<Quarantined, VaultError> {
        let dir = Self::errors_dir(folder);
        fs::create_dir_all(&dir).map_err(|source| VaultError::Io {
            path: dir.clone(),
            source,
        })?;

        let backup = dir.join(Self::backup_name(raw));
        if backup.exists() {
            log::debug!(
                "Backup of {} already present at {}",
                binary_path.display(),
                backup.display()
            );
            return Ok(Quarantined::AlreadyPresent(backup));
        }

        write_atomic(&backup, raw).map_err(|source| VaultError::Io {
            path: backup.clone(),
            source,
        })?;
        log::warn!(
            "Backed up unreadable save {} to {}",
            binary_path.display(),
            backup.display()
        );
        Ok(Quarantined::Created(backup))
    }
}
