//! Circuit breaker error types.

use thiserror::Error;

/// Errors raised by the circuit breaker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreakerError {
    /// The breaker is open; calls are short-circuited until the cooldown
    /// elapses.
    #[error("circuit open")]
    CircuitOpen,
}

/// Result type for circuit breaker operations.
pub type BreakerResult<T> = Result<T, BreakerError>;
