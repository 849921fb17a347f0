//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur setting up or operating telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging subsystem could not be initialized (e.g. a global
    /// subscriber is already installed).
    #[error("logging init error: {0}")]
    InitError(String),

    /// A supplied tracing directive could not be parsed.
    #[error("invalid log directive: {0}")]
    InvalidDirective(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
