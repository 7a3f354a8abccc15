//! Pair discovery and authority resolution.
//!
//! # Overview
//!
//! Files in a synced folder are grouped by base name into [`TrackedPair`]s:
//! `slot 1.sav` and `slot 1.yaml` form one pair. A pair is tracked as soon as
//! either side exists. For every pair the resolver decides which side is
//! authoritative:
//!
//! 1. If only one side exists, it wins and the other side is generated.
//! 2. Otherwise the side with the strictly later modification time wins.
//! 3. Equal modification times favour the binary side.
//!
//! Discovery does not recurse, so the quarantine folder and any other
//! subdirectories are ignored along with files of other extensions.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use walkdir::WalkDir;

/// Extension of the binary side of a pair.
pub const BINARY_EXTENSION: &str = "sav";

/// Extension of the text side of a pair.
pub const TEXT_EXTENSION: &str = "yaml";

/// Errors that can occur while discovering pairs.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// The folder does not exist.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while listing the folder or reading metadata.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// One side of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The encrypted save file.
    Binary,
    /// The editable text file.
    Text,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Binary => Self::Text,
            Self::Text => Self::Binary,
        }
    }

    /// File extension used for this side.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Binary => BINARY_EXTENSION,
            Self::Text => TEXT_EXTENSION,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            BINARY_EXTENSION => Some(Self::Binary),
            TEXT_EXTENSION => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// What has to happen to bring a pair back in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Decode the binary side and write the text side.
    Decode,
    /// Encode the text side and write the binary side.
    Encode,
}

impl Action {
    /// The action that regenerates the other side from `authority`.
    #[must_use]
    pub fn from_authority(authority: Side) -> Self {
        match authority {
            Side::Binary => Self::Decode,
            Side::Text => Self::Encode,
        }
    }
}

/// A binary/text pair sharing a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPair {
    /// Base name shared by both sides
    pub name: String,
    /// Path of the binary side (may not exist)
    pub binary: PathBuf,
    /// Path of the text side (may not exist)
    pub text: PathBuf,
    /// Modification time of the binary side, `None` if absent
    pub binary_modified: Option<SystemTime>,
    /// Modification time of the text side, `None` if absent
    pub text_modified: Option<SystemTime>,
}

impl TrackedPair {
    /// Path of the given side.
    #[must_use]
    pub fn path(&self, side: Side) -> &Path {
        match side {
            Side::Binary => &self.binary,
            Side::Text => &self.text,
        }
    }

    /// Whether the given side existed when the pair was discovered.
    #[must_use]
    pub fn exists(&self, side: Side) -> bool {
        match side {
            Side::Binary => self.binary_modified.is_some(),
            Side::Text => self.text_modified.is_some(),
        }
    }

    /// The side whose content should overwrite the other.
    #[must_use]
    pub fn authority(&self) -> Side {
        match (self.binary_modified, self.text_modified) {
            (Some(binary), Some(text)) if text > binary => Side::Text,
            (None, Some(_)) => Side::Text,
            // Ties go to the binary side
            _ => Side::Binary,
        }
    }

    /// Resolve the pair into a decision.
    #[must_use]
    pub fn decide(self) -> PairDecision {
        let authority = self.authority();
        PairDecision {
            action: Action::from_authority(authority),
            authority,
            pair: self,
        }
    }
}

/// A pair together with the resolution chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairDecision {
    /// The pair being resolved
    pub pair: TrackedPair,
    /// The side whose content wins
    pub authority: Side,
    /// How the other side is regenerated
    pub action: Action,
}

impl PairDecision {
    /// Path read as the source of truth.
    #[must_use]
    pub fn source(&self) -> &Path {
        self.pair.path(self.authority)
    }

    /// Path that will be regenerated.
    #[must_use]
    pub fn target(&self) -> &Path {
        self.pair.path(self.authority.other())
    }
}

/// Discovers pairs in a folder and decides their authority.
#[derive(Debug, Clone, Default)]
pub struct PairResolver {
    _private: (),
}

impl PairResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover all pairs in `folder`, ordered by base name.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the folder is missing, not a directory, or
    /// cannot be listed.
    pub fn discover(&self, folder: &Path) -> Result<Vec<TrackedPair>, ResolveError> {
        check_folder(folder)?;

        let mut pairs: BTreeMap<String, TrackedPair> = BTreeMap::new();

        for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(folder).to_path_buf();
                ResolveError::Io {
                    path,
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory walk failed")),
                }
            })?;

            let file_type = entry.file_type();
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }

            let path = entry.path();
            let side = match path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Side::from_extension)
            {
                Some(side) => side,
                None => continue,
            };
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => {
                    log::debug!("Skipping non UTF-8 file name: {}", path.display());
                    continue;
                }
            };

            let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) if e.kind() == io::ErrorKind::NotFound && file_type.is_symlink() => {
                    log::warn!("Skipping dangling symlink: {}", path.display());
                    continue;
                }
                Err(source) => {
                    return Err(ResolveError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            };

            let pair = pairs.entry(name.clone()).or_insert_with(|| TrackedPair {
                binary: folder.join(format!("{name}.{BINARY_EXTENSION}")),
                text: folder.join(format!("{name}.{TEXT_EXTENSION}")),
                name,
                binary_modified: None,
                text_modified: None,
            });
            match side {
                Side::Binary => pair.binary_modified = Some(modified),
                Side::Text => pair.text_modified = Some(modified),
            }
        }

        log::debug!("Discovered {} pair(s) in {}", pairs.len(), folder.display());
        Ok(pairs.into_values().collect())
    }

    /// Discover all pairs in `folder` and decide each one.
    ///
    /// # Errors
    ///
    /// See [`PairResolver::discover`].
    pub fn resolve(&self, folder: &Path) -> Result<Vec<PairDecision>, ResolveError> {
        Ok(self
            .discover(folder)?
            .into_iter()
            .map(TrackedPair::decide)
            .collect())
    }
}

fn check_folder(folder: &Path) -> Result<(), ResolveError> {
    match std::fs::metadata(folder) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(ResolveError::NotADirectory(folder.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(ResolveError::NotFound(folder.to_path_buf()))
        }
        Err(source) => Err(ResolveError::Io {
            path: folder.to_path_buf(),
            source,
        }),
    }
}
