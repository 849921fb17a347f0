//! Error type shared by every tier service.

use thiserror::Error;

/// Failures raised by tier handlers, coordination state, or the
/// intervention log.
#[derive(Debug, Error)]
pub enum VsmError {
    #[error("bus error: {0}")]
    Bus(#[from] cyb_bus::BusError),
    #[error("audit error: {0}")]
    Audit(#[from] cyb_audit::AuditError),
    #[error("unknown routing key: {0}")]
    UnknownRoute(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result alias for tier operations.
pub type VsmResult<T> = Result<T, VsmError>;
