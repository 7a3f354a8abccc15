//! Content fingerprints for change detection.
//!
//! A [`Fingerprint`] summarises one file as its modification time, size and
//! BLAKE3 content hash. The [`FingerprintStore`] remembers the last
//! fingerprint seen per path so unchanged files are not re-hashed, and
//! answers "has this file changed since I last looked at it".
//!
//! Nothing is persisted; every process starts with an empty store.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// BLAKE3 digest of a file's content.
pub type Hash = [u8; 32];

/// Errors that can occur while fingerprinting a file.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The file does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while reading metadata or content.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FingerprintError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Summary of a file's state at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    /// Last modification time
    pub modified: SystemTime,
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 hash of the content
    pub hash: Hash,
}

impl Fingerprint {
    /// Hex representation of the content hash.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        blake3::Hash::from(self.hash).to_hex().to_string()
    }
}

/// Per-path cache of fingerprints.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    entries: HashMap<PathBuf, Fingerprint>,
    paranoid: bool,
}

impl FingerprintStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always re-hash on observation instead of trusting unchanged metadata.
    ///
    /// Catches edits that keep both size and modification time, at the cost
    /// of reading every observed file in full.
    #[must_use]
    pub fn with_paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid = paranoid;
        self
    }

    /// Fingerprint `path` as it is now and remember the result.
    ///
    /// The content hash is reused from the cache when the modification time
    /// and size match the previous observation.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::NotFound`] if the file is missing, or
    /// [`FingerprintError::Io`] if it cannot be read.
    pub fn observe(&mut self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let metadata = fs::metadata(path).map_err(|e| FingerprintError::from_io(path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| FingerprintError::from_io(path, e))?;
        let size = metadata.len();

        if !self.paranoid {
            if let Some(cached) = self.entries.get(path) {
                if cached.modified == modified && cached.size == size {
                    return Ok(*cached);
                }
            }
        }

        let fingerprint = Fingerprint {
            modified,
            size,
            hash: hash_file(path)?,
        };
        log::trace!(
            "Fingerprinted {} ({} bytes, {})",
            path.display(),
            size,
            fingerprint.hash_hex()
        );
        self.entries.insert(path.to_path_buf(), fingerprint);
        Ok(fingerprint)
    }

    /// Check whether `path` differs from a previously captured fingerprint.
    ///
    /// `previous` is `None` when the file did not exist at capture time, so
    /// files that appeared or vanished since then count as changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn changed_since(
        &mut self,
        path: &Path,
        previous: Option<&Fingerprint>,
    ) -> Result<bool, FingerprintError> {
        let current = match self.observe(path) {
            Ok(fingerprint) => Some(fingerprint),
            Err(FingerprintError::NotFound(_)) => {
                self.entries.remove(path);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(current.as_ref() != previous)
    }

    /// Observe every existing path and return the fingerprints by path.
    ///
    /// Paths that do not exist are left out of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error other than a missing file.
    pub fn snapshot<'a, I>(&mut self, paths: I) -> Result<HashMap<PathBuf, Fingerprint>, FingerprintError>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut snapshot = HashMap::new();
        for path in paths {
            match self.observe(path) {
                Ok(fingerprint) => {
                    snapshot.insert(path.to_path_buf(), fingerprint);
                }
                Err(FingerprintError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(snapshot)
    }
}

fn hash_file(path: &Path) -> Result<Hash, FingerprintError> {
    let mut file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher).map_err(|e| FingerprintError::from_io(path, e))?;
    Ok(*hasher.finalize().as_bytes())
}
