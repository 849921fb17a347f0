//! Timestamp wrapper used for consistent serialization and comparisons.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// UTC timestamp wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Epoch-millisecond representation, used as the wire format for bus
    /// messages and audit entries.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Build a timestamp from epoch milliseconds.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// `self + duration_ms <= other`, used by window-horizon checks.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// Whether `self` is strictly before now.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Add a millisecond offset, saturating rather than panicking.
    #[must_use]
    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0 + Duration::milliseconds(millis))
    }

    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_roundtrip() {
        let ts = Timestamp::now();
        let millis = ts.as_millis();
        let back = Timestamp::from_millis(millis).unwrap();
        assert_eq!(ts.as_millis(), back.as_millis());
    }

    #[test]
    fn elapsed_since_is_nonnegative_for_later_timestamp() {
        let start = Timestamp::now();
        let end = start.plus_millis(5_000);
        assert_eq!(end.elapsed_since(start).num_milliseconds(), 5_000);
    }
}
