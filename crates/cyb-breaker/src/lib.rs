//! Circuit breaker (C6): per-service closed/open/half-open state machine
//! guarding the LLM router's provider calls (spec §4.6, §4.10).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod breaker;
pub mod error;
pub mod prelude;

pub use breaker::{BreakerConfig, BreakerSnapshot, BreakerStateKind, CircuitBreaker};
pub use error::{BreakerError, BreakerResult};
