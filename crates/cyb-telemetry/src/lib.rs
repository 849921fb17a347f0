//! Telemetry bus (C4): synchronous in-process event emission, a listener
//! registry, and a rolling-window aggregator, plus the ambient `tracing`
//! setup every binary in the workspace installs at startup.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod aggregator;
pub mod bus;
pub mod error;
pub mod event;
pub mod logging;
pub mod prelude;

pub use aggregator::{AggregateSnapshot, AggregatorConfig, TelemetryAggregator};
pub use bus::TelemetryBus;
pub use error::{TelemetryError, TelemetryResult};
pub use event::TelemetryEvent;
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
