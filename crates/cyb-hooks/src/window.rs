//! Per-hook sliding window of matching events (spec §3 `WindowState`).

use cyb_core::Timestamp;
use serde_json::Value;
use std::collections::VecDeque;

/// Ordered `(timestamp, event)` pairs retained within a hook's
/// `window_ms`, with a cached count so threshold checks don't rescan.
#[derive(Debug, Default)]
pub struct WindowState {
    entries: VecDeque<(Timestamp, Value)>,
}

impl WindowState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop entries older than `window_ms` relative to `now`.
    pub fn prune(&mut self, now: Timestamp, window_ms: i64) {
        while let Some((ts, _)) = self.entries.front() {
            if now.elapsed_since(*ts).num_milliseconds() > window_ms {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Append a matching event at `now`.
    pub fn push(&mut self, now: Timestamp, event: Value) {
        self.entries.push_back((now, event));
    }

    /// Current retained count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Events-per-minute rate observed across the retained window, using
    /// the span from the oldest retained entry to `now` (or `window_ms` if
    /// the window isn't yet full).
    #[must_use]
    pub fn rate_per_minute(&self, now: Timestamp, window_ms: i64) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let span_ms = self
            .entries
            .front()
            .map(|(ts, _)| now.elapsed_since(*ts).num_milliseconds())
            .unwrap_or(window_ms)
            .max(1);
        let span_minutes = span_ms as f64 / 60_000.0;
        self.entries.len() as f64 / span_minutes
    }

    /// Clear the window, done after a threshold fires (spec §4.8).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prune_drops_entries_past_the_horizon() {
        let mut window = WindowState::new();
        let t0 = Timestamp::now();
        window.push(t0, json!({}));
        let later = t0.plus_millis(100);
        window.prune(later, 50);
        assert!(window.is_empty());
    }

    #[test]
    fn clear_empties_the_window() {
        let mut window = WindowState::new();
        window.push(Timestamp::now(), json!({}));
        window.clear();
        assert_eq!(window.count(), 0);
    }
}
