//! Convenience re-exports for downstream crates.

pub use crate::broker::{AckOutcome, DeadLetterStore, Handler, InMemoryMessageBus, QueuePolicy};
pub use crate::envelope::Envelope;
pub use crate::error::{BusError, BusResult};
pub use crate::nonce::ReplayCache;
