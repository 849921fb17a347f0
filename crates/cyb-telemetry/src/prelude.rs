//! Convenience re-exports for downstream crates.

pub use crate::aggregator::{AggregateSnapshot, AggregatorConfig, TelemetryAggregator};
pub use crate::bus::TelemetryBus;
pub use crate::error::{TelemetryError, TelemetryResult};
pub use crate::event::TelemetryEvent;
pub use crate::logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
