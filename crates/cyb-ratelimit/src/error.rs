//! Rate limiter error types.

use thiserror::Error;

/// Errors raised by the rate limiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The budget has no tokens left in the current window.
    #[error("rate limited")]
    RateLimited,

    /// No budget with that name has been declared.
    #[error("unknown budget: {0}")]
    UnknownBudget(String),
}

/// Result type for rate limiter operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;
