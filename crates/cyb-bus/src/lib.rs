//! Message bus client (C1): durable publish/consume on topic exchanges,
//! ack/nack with exponential-backoff requeue, dead-lettering, and
//! per-`(tenant_id, nonce)` replay suppression.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod broker;
pub mod envelope;
pub mod error;
pub mod nonce;
pub mod prelude;
pub mod topic;

pub use broker::{AckOutcome, DeadLetterStore, Handler, InMemoryMessageBus, QueuePolicy};
pub use envelope::Envelope;
pub use error::{BusError, BusResult};
pub use nonce::ReplayCache;
