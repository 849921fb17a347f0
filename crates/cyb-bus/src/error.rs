//! Bus error types.

use thiserror::Error;

/// Errors raised by the bus client.
#[derive(Debug, Error)]
pub enum BusError {
    /// No queue is bound with that name.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    /// A queue with that name is already registered.
    #[error("queue already exists: {0}")]
    QueueExists(String),

    /// The queue's inbound channel is full; the publisher should back off.
    #[error("queue {0} is at capacity")]
    Backpressure(String),

    /// The broker connection was lost and could not be reestablished.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;
