//! Ctrl+C handling.
//!
//! A shared `AtomicBool` is set when the process receives Ctrl+C (or
//! SIGTERM/SIGHUP). The sync engine checks it between pairs. Code that
//! blocks, like cache mode waiting for the finalize command, registers a
//! listener with [`ShutdownHandler::on_shutdown`] and is woken directly, so
//! an interrupted run never leaves a pair half-written.
//!
//! ```rust,no_run
//! use bl4_auto_crypter::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let flag = handler.get_flag();
//! // Hand `flag` to SyncEngine::with_shutdown_flag, `handler` to DaemonConfig::with_shutdown
//! ```

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type Listener = Box<dyn Fn() + Send>;

/// Shared shutdown flag plus listeners to wake on shutdown.
#[derive(Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl fmt::Debug for ShutdownHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHandler")
            .field("requested", &self.is_shutdown_requested())
            .finish_non_exhaustive()
    }
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag and call every registered listener.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
    }

    /// Call `listener` when shutdown is requested.
    ///
    /// If shutdown was already requested, `listener` is called right away.
    pub fn on_shutdown<F>(&self, listener: F)
    where
        F: Fn() + Send + 'static,
    {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_shutdown_requested() {
            listener();
        }
        listeners.push(Box::new(listener));
    }

    /// Clone of the flag for the engine.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag and drop all listeners.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler.
///
/// Calling this more than once returns the already installed handler,
/// reset, so repeated `run_app` calls (as in tests) succeed.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if a different handler was
/// already registered with `ctrlc` by someone else.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let signalled = handler.clone();

    ctrlc::set_handler(move || {
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current pair...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
        signalled.request_shutdown();
    })?;

    let _ = GLOBAL_HANDLER.set(handler.clone());
    Ok(handler)
}
