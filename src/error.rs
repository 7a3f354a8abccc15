//! Structured error handling and exit codes.

use serde::Serialize;

use crate::daemon::DaemonError;
use crate::sync::SyncError;

/// Exit codes for the application.
///
/// - 0: Success (every pair in sync, or only quarantined pairs)
/// - 1: General error (bad arguments, missing folder, protocol failure)
/// - 3: Partial success (pass completed but some pairs failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The requested operation completed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Partial success: A pass completed but some pairs could not be synced.
    PartialSuccess = 3,
    /// Interrupted: The run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "BC000",
            Self::GeneralError => "BC001",
            Self::PartialSuccess => "BC003",
            Self::Interrupted => "BC130",
        }
    }

    /// Pick the exit code for an error returned by `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<SyncError>(),
                Some(SyncError::Interrupted)
            ) || matches!(
                cause.downcast_ref::<DaemonError>(),
                Some(DaemonError::Interrupted | DaemonError::Sync(SyncError::Interrupted))
            )
        });

        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "BC001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
