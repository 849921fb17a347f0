//! The `(event_name, measurements, metadata)` triple every component emits.

use cyb_core::{Severity, Timestamp};
use std::collections::HashMap;

/// A single telemetry emission.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub event_name: String,
    pub measurements: HashMap<String, f64>,
    pub metadata: HashMap<String, String>,
    pub severity: Severity,
    pub source: String,
    pub emitted_at: Timestamp,
}

impl TelemetryEvent {
    #[must_use]
    pub fn new(event_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            measurements: HashMap::new(),
            metadata: HashMap::new(),
            severity: Severity::Unknown,
            source: source.into(),
            emitted_at: Timestamp::now(),
        }
    }

    #[must_use]
    pub fn with_measurement(mut self, key: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}
