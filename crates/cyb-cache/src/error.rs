//! Cache error types.

use thiserror::Error;

/// Errors raised by the deterministic cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No entry for that key, or it has expired.
    #[error("not found")]
    NotFound,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
