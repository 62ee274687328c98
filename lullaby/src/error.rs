//! Error types for `Lullaby`
//!
//! Top-level error hierarchy and CLI exit codes. Configuration errors live
//! in `lullaby-core` and are re-exported here.

use std::time::Duration;
use thiserror::Error;

pub use lullaby_core::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `Lullaby` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Sleep timer error (rejected activation)
    pub const TIMER_ERROR: i32 = 5;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `Lullaby` operations.
///
/// Aggregates all domain-specific errors and maps them to exit codes.
#[derive(Debug, Error)]
pub enum LullabyError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sleep timer error
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LullabyError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Timer(_) => ExitCode::TIMER_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Timer Errors
// ============================================================================

/// Errors returned by the sleep timer engine.
///
/// The engine only fails on misuse; collaborator failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Activation was requested with a zero duration
    #[error("sleep duration must be positive, got {}", humantime::format_duration(*.0))]
    InvalidDuration(Duration),

    /// A countdown step of zero would never advance
    #[error("tick interval must be positive")]
    ZeroTick,

    /// The timer was shut down and no longer accepts activations
    #[error("sleep timer is shut down")]
    ShutDown,
}
