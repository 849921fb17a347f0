//! Convenience re-exports for downstream crates.

pub use crate::breaker::{BreakerConfig, BreakerSnapshot, BreakerStateKind, CircuitBreaker};
pub use crate::error::{BreakerError, BreakerResult};
