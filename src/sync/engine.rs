//! One reconciliation pass over a folder.
//!
//! # Overview
//!
//! [`SyncEngine::run_once`] resolves every pair in a folder and regenerates
//! the stale side of each one from its authoritative side:
//!
//! - Regenerated bytes identical to the current target are not written, so
//!   running a pass over an already consistent folder changes nothing.
//! - A binary side that fails to decode is backed up through the
//!   [`ErrorVault`] and the pair is skipped; the pass carries on.
//! - Any other per-pair failure is recorded in the [`SyncReport`] and the
//!   pass carries on with the next pair.
//!
//! Written files receive the filesystem's current time, which makes the
//! freshly written side the newer one on the next pass. Because its content
//! re-encodes to the same bytes, that next pass is a no-op.
//!
//! # Example
//!
//! ```no_run
//! use bl4_auto_crypter::codec::{SaveCodec, UserKey};
//! use bl4_auto_crypter::sync::SyncEngine;
//! use std::path::Path;
//!
//! let key = UserKey::from_user_id("72057594037927937").unwrap();
//! let engine = SyncEngine::new(SaveCodec::new());
//! let report = engine.run_once(Path::new("saves"), &key).unwrap();
//! println!("{}", report.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::atomic::write_atomic;
use super::pairs::{Action, PairDecision, PairResolver, ResolveError};
use super::vault::{ErrorVault, Quarantined, VaultError};
use crate::codec::{Codec, DecodeFailure, EncodeFailure, UserKey};

/// Errors that abort a whole pass.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// The pass was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Sync interrupted by user")]
    Interrupted,

    /// The folder could not be scanned.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Errors confined to a single pair.
#[derive(thiserror::Error, Debug)]
pub enum PairError {
    /// The text side could not be encoded.
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// Text file that failed to encode
        path: PathBuf,
        /// The codec failure
        #[source]
        source: EncodeFailure,
    },

    /// Reading the source or writing the target failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An undecodable file could not be backed up.
    #[error(transparent)]
    Quarantine(#[from] VaultError),
}

/// Result of applying one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// The target was rewritten.
    Updated {
        /// File that was written
        written: PathBuf,
    },
    /// The target already held the regenerated content.
    Unchanged,
    /// The binary side could not be decoded and was backed up.
    Quarantined {
        /// Why decoding failed
        reason: DecodeFailure,
        /// Where the backup lives
        backup: Quarantined,
    },
}

/// A pair whose stale side was regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedPair {
    /// Base name of the pair
    pub name: String,
    /// Transform applied
    pub action: Action,
    /// File that was written
    pub written: PathBuf,
}

/// A pair skipped because its binary side is unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantinedPair {
    /// Base name of the pair
    pub name: String,
    /// The unreadable binary file, left untouched
    pub source: PathBuf,
    /// Why decoding failed
    pub reason: String,
    /// Backup written (or found) in the errors folder
    pub backup: Quarantined,
}

/// A pair that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPair {
    /// Base name of the pair
    pub name: String,
    /// Error description
    pub error: String,
}

/// What a pass did, pair by pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Pairs where one side was rewritten
    pub updated: Vec<UpdatedPair>,
    /// Pairs that were already consistent
    pub unchanged: Vec<String>,
    /// Pairs skipped because the binary could not be decoded
    pub quarantined: Vec<QuarantinedPair>,
    /// Pairs that failed for any other reason
    pub failures: Vec<FailedPair>,
}

impl SyncReport {
    /// Number of pairs covered by the report.
    #[must_use]
    pub fn total(&self) -> usize {
        self.updated.len() + self.unchanged.len() + self.quarantined.len() + self.failures.len()
    }

    /// Whether any pair failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether the pass left every file untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.updated.is_empty()
            && self
                .quarantined
                .iter()
                .all(|q| matches!(q.backup, Quarantined::AlreadyPresent(_)))
    }

    /// Human-readable summary of the pass.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} pair(s): {} updated, {} unchanged, {} quarantined, {} failed",
            self.total(),
            self.updated.len(),
            self.unchanged.len(),
            self.quarantined.len(),
            self.failures.len()
        )
    }
}

/// Runs reconciliation passes with a given codec.
#[derive(Debug)]
pub struct SyncEngine<C> {
    codec: C,
    resolver: PairResolver,
    vault: ErrorVault,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl<C: Codec> SyncEngine<C> {
    /// Create an engine around `codec`.
    #[must_use]
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            resolver: PairResolver::new(),
            vault: ErrorVault::new(),
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag, checked between pairs.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The pair resolver in use.
    #[must_use]
    pub fn resolver(&self) -> &PairResolver {
        &self.resolver
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Reconcile every pair in `folder`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Resolve`] if the folder cannot be scanned, or
    /// [`SyncError::Interrupted`] if shutdown was requested. Per-pair
    /// problems are reported in the returned [`SyncReport`] instead.
    pub fn run_once(&self, folder: &Path, key: &UserKey) -> Result<SyncReport, SyncError> {
        log::info!("Syncing {}", folder.display());
        let decisions = self.resolver.resolve(folder)?;
        self.apply_all(folder, key, decisions)
    }

    /// Apply the given decisions in order.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Interrupted`] if shutdown was requested between
    /// two pairs. Pairs already applied stay applied.
    pub fn apply_all(
        &self,
        folder: &Path,
        key: &UserKey,
        decisions: Vec<PairDecision>,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        for decision in decisions {
            if self.is_shutdown_requested() {
                log::info!("Shutdown requested, stopping after {} pair(s)", report.total());
                return Err(SyncError::Interrupted);
            }

            let name = decision.pair.name.clone();
            match self.apply(folder, key, &decision) {
                Ok(PairOutcome::Updated { written }) => {
                    log::info!("Updated {} ({:?})", written.display(), decision.action);
                    report.updated.push(UpdatedPair {
                        name,
                        action: decision.action,
                        written,
                    });
                }
                Ok(PairOutcome::Unchanged) => {
                    log::debug!("Already in sync: {name}");
                    report.unchanged.push(name);
                }
                Ok(PairOutcome::Quarantined { reason, backup }) => {
                    log::warn!(
                        "Could not decode {}: {}; skipped, backup at {}",
                        decision.source().display(),
                        reason,
                        backup.backup_path().display()
                    );
                    report.quarantined.push(QuarantinedPair {
                        name,
                        source: decision.source().to_path_buf(),
                        reason: reason.to_string(),
                        backup,
                    });
                }
                Err(e) => {
                    log::error!("Failed to sync {name}: {e}");
                    report.failures.push(FailedPair {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!("Sync of {} finished: {}", folder.display(), report.summary());
        Ok(report)
    }

    /// Regenerate the non-authoritative side of one pair.
    ///
    /// # Errors
    ///
    /// Returns [`PairError`] if the source cannot be read, the target cannot
    /// be written, encoding fails, or an unreadable binary cannot be backed
    /// up. Decode failures are not errors; they yield
    /// [`PairOutcome::Quarantined`].
    pub fn apply(
        &self,
        folder: &Path,
        key: &UserKey,
        decision: &PairDecision,
    ) -> Result<PairOutcome, PairError> {
        let source = decision.source();
        let raw = fs::read(source).map_err(|e| PairError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

        let regenerated = match decision.action {
            Action::Decode => match self.codec.decode(&raw, key) {
                Ok(text) => text,
                Err(reason) => {
                    let backup = self.vault.quarantine(folder, source, &raw)?;
                    return Ok(PairOutcome::Quarantined { reason, backup });
                }
            },
            Action::Encode => self
                .codec
                .encode(&raw, key)
                .map_err(|e| PairError::Encode {
                    path: source.to_path_buf(),
                    source: e,
                })?,
        };

        write_if_changed(decision.target(), &regenerated)
    }
}

fn write_if_changed(target: &Path, content: &[u8]) -> Result<PairOutcome, PairError> {
    match fs::read(target) {
        Ok(existing) if existing == content => return Ok(PairOutcome::Unchanged),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(PairError::Io {
                path: target.to_path_buf(),
                source: e,
            })
        }
    }

    write_atomic(target, content).map_err(|e| PairError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;
    Ok(PairOutcome::Updated {
        written: target.to_path_buf(),
    })
}
