//! Auth errors carry the shared [`ErrorKind`] vocabulary directly, since
//! the HTTP edge (C14) and bus nack logic dispatch on that closed set
//! rather than a crate-local error enum.

use cyb_core::{CybernikError, ErrorKind};

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, CybernikError>;

/// Build an [`CybernikError`] of the given `kind`, used throughout this
/// crate so call sites read like the spec's own error vocabulary.
#[must_use]
pub fn auth_error(kind: ErrorKind, message: impl Into<String>) -> CybernikError {
    CybernikError::new(kind, message)
}

/// Lift a storage failure into the shared error vocabulary. `cyb-storage`
/// and `cyb-core` are both external to this crate, so the conversion lives
/// here as a function rather than a `From` impl (orphan rule).
#[must_use]
pub fn storage_error(e: cyb_storage::StorageError) -> CybernikError {
    CybernikError::new(ErrorKind::StorageError, e.to_string())
}
