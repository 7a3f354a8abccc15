//! Folder synchronisation.
//!
//! This module keeps every binary save in a folder paired with an up to
//! date text copy, and the other way round.
//!
//! # Architecture
//!
//! * [`pairs`]: Discovers `<name>.sav` / `<name>.yaml` pairs and picks the
//!   authoritative side of each.
//! * [`engine`]: Runs a reconciliation pass and reports what it did.
//! * [`vault`]: Backs up binaries that fail to decode.
//! * [`fingerprint`]: Tracks file content to detect changes between passes.
//! * [`atomic`]: Replaces files without exposing partial writes.

pub mod atomic;
pub mod engine;
pub mod fingerprint;
pub mod pairs;
pub mod vault;

pub use engine::{
    FailedPair, PairError, PairOutcome, QuarantinedPair, SyncEngine, SyncError, SyncReport,
    UpdatedPair,
};
pub use fingerprint::{Fingerprint, FingerprintError, FingerprintStore};
pub use pairs::{Action, PairDecision, PairResolver, ResolveError, Side, TrackedPair};
pub use vault::{ErrorVault, Quarantined, VaultError, ERRORS_DIR_NAME};
