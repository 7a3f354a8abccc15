//! Cache mode: sync, hold the folder open, then sync again on request.
//!
//! # Overview
//!
//! The [`CacheDaemon`] walks through four states:
//!
//! ```text
//! Idle -> InitialSyncDone -> Finalizing -> Exited
//! ```
//!
//! 1. **Idle**: run a full pass, then fingerprint every tracked file.
//! 2. **InitialSyncDone**: print [`READY_LINE`] and block on the control
//!    input until the finalize command (`g`) arrives. Other programs are
//!    free to edit either side of any pair meanwhile.
//! 3. **Finalizing**: re-resolve the folder and apply only the pairs where a
//!    side changed, appeared, or vanished since the snapshot.
//! 4. **Exited**: the closing report is returned.
//!
//! Unknown commands, end of input, a configured timeout expiring, or
//! Ctrl+C all end the wait with an error and the closing pass does not run.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::codec::{Codec, UserKey};
use crate::signal::ShutdownHandler;
use crate::sync::{
    Fingerprint, FingerprintError, FingerprintStore, Side, SyncEngine, SyncError, SyncReport,
};

/// Line announcing that the initial pass is complete.
pub const READY_LINE: &str = "first sync done; waiting for input";

/// Control byte that triggers the closing pass.
pub const FINALIZE_COMMAND: u8 = b'g';

/// Errors that can end cache mode.
#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    /// A sync pass failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Fingerprinting a tracked file failed.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// The readiness line could not be written.
    #[error("failed to announce readiness: {0}")]
    Announce(#[source] io::Error),

    /// Reading the control input failed.
    #[error("failed to read control input: {0}")]
    ControlIo(#[source] io::Error),

    /// The control input sent something other than the finalize command.
    #[error("unexpected control input {0:?}; expected 'g'")]
    UnexpectedCommand(char),

    /// The control input closed before the finalize command arrived.
    #[error("control input closed before finalize command")]
    ControlClosed,

    /// No finalize command arrived within the configured timeout.
    #[error("no finalize command within {0:?}")]
    Timeout(Duration),

    /// Shutdown was requested while waiting.
    #[error("Cache mode interrupted by user")]
    Interrupted,
}

/// State held between the initial pass and the closing pass.
#[derive(Debug)]
pub struct CacheSession {
    /// Folder being synced
    pub folder: PathBuf,
    /// Key for the folder's saves
    pub key: UserKey,
    /// Fingerprints of every tracked file after the initial pass
    pub snapshot: HashMap<PathBuf, Fingerprint>,
    /// What the initial pass did
    pub initial_report: SyncReport,
}

/// Position in the cache mode lifecycle.
#[derive(Debug)]
pub enum DaemonState {
    /// Nothing done yet.
    Idle,
    /// Initial pass done, waiting for the finalize command.
    InitialSyncDone(CacheSession),
    /// Finalize command received, closing pass pending.
    Finalizing(CacheSession),
    /// Closing pass done.
    Exited(SyncReport),
}

impl DaemonState {
    /// Short name of the state for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InitialSyncDone(_) => "initial-sync-done",
            Self::Finalizing(_) => "finalizing",
            Self::Exited(_) => "exited",
        }
    }
}

/// Configuration for cache mode.
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    /// Give up waiting for the finalize command after this long.
    pub finalize_timeout: Option<Duration>,
    /// Re-hash files even when their metadata is unchanged.
    pub paranoid: bool,
    /// Wakes the finalize wait on Ctrl+C.
    pub shutdown: Option<ShutdownHandler>,
}

impl DaemonConfig {
    /// Set the finalize timeout.
    #[must_use]
    pub fn with_finalize_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.finalize_timeout = timeout;
        self
    }

    /// Enable or disable paranoid change detection.
    #[must_use]
    pub fn with_paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid = paranoid;
        self
    }

    /// Set the shutdown handler for graceful termination.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownHandler) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// Drives cache mode over one folder.
#[derive(Debug)]
pub struct CacheDaemon<C> {
    engine: SyncEngine<C>,
    config: DaemonConfig,
    fingerprints: FingerprintStore,
}

impl<C: Codec> CacheDaemon<C> {
    /// Create a daemon around `engine`.
    #[must_use]
    pub fn new(engine: SyncEngine<C>, config: DaemonConfig) -> Self {
        let fingerprints = FingerprintStore::new().with_paranoid(config.paranoid);
        Self {
            engine,
            config,
            fingerprints,
        }
    }

    /// Run the whole lifecycle: initial pass, announce on `out`, wait for
    /// the finalize command on `control`, closing pass.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError`] if a pass fails at folder level, the
    /// announcement cannot be written, or the wait ends without a finalize
    /// command.
    pub fn run<R, W>(
        &mut self,
        folder: &Path,
        key: &UserKey,
        control: R,
        out: &mut W,
    ) -> Result<SyncReport, DaemonError>
    where
        R: Read + Send + 'static,
        W: Write,
    {
        let mut control = Some(control);
        let mut state = DaemonState::Idle;

        loop {
            log::debug!("Cache mode state: {}", state.name());
            state = match state {
                DaemonState::Idle => {
                    DaemonState::InitialSyncDone(self.initial_sync(folder, key)?)
                }
                DaemonState::InitialSyncDone(session) => {
                    announce(out)?;
                    match control.take() {
                        Some(input) => self.wait_for_finalize(ControlChannel::spawn(input))?,
                        None => return Err(DaemonError::ControlClosed),
                    }
                    DaemonState::Finalizing(session)
                }
                DaemonState::Finalizing(session) => DaemonState::Exited(self.finalize(session)?),
                DaemonState::Exited(report) => return Ok(report),
            };
        }
    }

    /// `Idle -> InitialSyncDone`: full pass, then snapshot every tracked file.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError`] if the pass or fingerprinting fails.
    pub fn initial_sync(&mut self, folder: &Path, key: &UserKey) -> Result<CacheSession, DaemonError> {
        let initial_report = self.engine.run_once(folder, key)?;

        let pairs = self
            .engine
            .resolver()
            .discover(folder)
            .map_err(SyncError::from)?;
        let paths = pairs
            .iter()
            .flat_map(|p| [p.path(Side::Binary), p.path(Side::Text)]);
        let snapshot = self.fingerprints.snapshot(paths)?;
        log::debug!("Fingerprinted {} file(s) after initial sync", snapshot.len());

        Ok(CacheSession {
            folder: folder.to_path_buf(),
            key: key.clone(),
            snapshot,
            initial_report,
        })
    }

    /// `InitialSyncDone -> Finalizing`: block until the finalize command.
    ///
    /// ASCII whitespace is ignored so line-oriented writers can send `g\n`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::UnexpectedCommand`],
    /// [`DaemonError::ControlClosed`], [`DaemonError::Timeout`],
    /// [`DaemonError::ControlIo`] or [`DaemonError::Interrupted`].
    pub fn wait_for_finalize(&self, channel: ControlChannel) -> Result<(), DaemonError> {
        if let Some(shutdown) = &self.config.shutdown {
            let notify = channel.sender.clone();
            shutdown.on_shutdown(move || {
                let _ = notify.send(ControlEvent::Shutdown);
            });
        }

        let deadline = self.config.finalize_timeout.map(|t| Instant::now() + t);

        loop {
            let event = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match channel.events.recv_timeout(remaining) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => {
                            return Err(DaemonError::Timeout(
                                self.config.finalize_timeout.unwrap_or_default(),
                            ))
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            return Err(DaemonError::ControlClosed)
                        }
                    }
                }
                None => channel
                    .events
                    .recv()
                    .map_err(|_| DaemonError::ControlClosed)?,
            };

            match event {
                ControlEvent::Byte(FINALIZE_COMMAND) => {
                    log::info!("Finalize command received");
                    return Ok(());
                }
                ControlEvent::Byte(b) if b.is_ascii_whitespace() => {}
                ControlEvent::Byte(b) => return Err(DaemonError::UnexpectedCommand(char::from(b))),
                ControlEvent::Closed => return Err(DaemonError::ControlClosed),
                ControlEvent::Failed(e) => return Err(DaemonError::ControlIo(e)),
                ControlEvent::Shutdown => return Err(DaemonError::Interrupted),
            }
        }
    }

    /// `Finalizing -> Exited`: sync only what changed since the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError`] if the folder cannot be scanned or a changed
    /// file cannot be fingerprinted.
    pub fn finalize(&mut self, session: CacheSession) -> Result<SyncReport, DaemonError> {
        let CacheSession {
            folder,
            key,
            snapshot,
            ..
        } = session;

        let decisions = self.engine.resolver().resolve(&folder).map_err(SyncError::from)?;

        let mut changed = Vec::new();
        for decision in decisions {
            let mut dirty = false;
            for side in [Side::Binary, Side::Text] {
                let path = decision.pair.path(side);
                if self.fingerprints.changed_since(path, snapshot.get(path))? {
                    log::debug!("Changed while waiting: {}", path.display());
                    dirty = true;
                }
            }
            if dirty {
                changed.push(decision);
            }
        }

        if changed.is_empty() {
            log::info!("Nothing changed while waiting");
            return Ok(SyncReport::default());
        }

        log::info!("{} pair(s) changed while waiting", changed.len());
        Ok(self.engine.apply_all(&folder, &key, changed)?)
    }
}

fn announce<W: Write>(out: &mut W) -> Result<(), DaemonError> {
    writeln!(out, "{READY_LINE}").map_err(DaemonError::Announce)?;
    out.flush().map_err(DaemonError::Announce)
}

/// Event produced by the control reader thread.
#[derive(Debug)]
enum ControlEvent {
    Byte(u8),
    Closed,
    Failed(io::Error),
    Shutdown,
}

/// Control input read on a background thread.
///
/// The reader thread performs blocking reads and forwards each byte over a
/// channel. Ctrl+C is delivered on the same channel, so the waiting side
/// blocks on a single receive.
#[derive(Debug)]
pub struct ControlChannel {
    events: Receiver<ControlEvent>,
    sender: Sender<ControlEvent>,
}

impl ControlChannel {
    /// Start reading `input` on a background thread.
    #[must_use]
    pub fn spawn<R: Read + Send + 'static>(mut input: R) -> Self {
        let (tx, rx) = mpsc::channel();
        let sender = tx.clone();

        let spawned = thread::Builder::new()
            .name("control-input".into())
            .spawn(move || {
                let mut buf = [0u8; 64];
                loop {
                    match input.read(&mut buf) {
                        Ok(0) => {
                            let _ = tx.send(ControlEvent::Closed);
                            return;
                        }
                        Ok(n) => {
                            for &b in &buf[..n] {
                                if tx.send(ControlEvent::Byte(b)).is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            let _ = tx.send(ControlEvent::Failed(e));
                            return;
                        }
                    }
                }
            });

        if let Err(e) = spawned {
            log::error!("Failed to start control input reader: {e}");
            let _ = sender.send(ControlEvent::Failed(e));
        }

        Self { events: rx, sender }
    }
}
