//! Audit error types.

use thiserror::Error;

/// Errors raised by the audit chain.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store failed to read or write.
    #[error("storage error: {0}")]
    Storage(#[from] cyb_storage::StorageError),
    /// An entry could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// `verify_integrity` was called with a `from`/`to` id not present in
    /// the chain.
    #[error("unknown entry id: {0}")]
    UnknownEntry(uuid::Uuid),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
