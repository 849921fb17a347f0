//! Per-username sliding-window failure tracking for `authenticate`'s
//! rate limit (spec §4.2: ≥5 failures within 5 minutes blocks further
//! attempts; failures are pruned after 1h regardless of the 5-minute
//! threshold, so memory doesn't grow unbounded for usernames that stop
//! being tried).

use cyb_core::Timestamp;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;

const THRESHOLD_WINDOW: Duration = Duration::from_secs(5 * 60);
const THRESHOLD_COUNT: usize = 5;
const RETENTION_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Tracks recent authentication failures per username.
#[derive(Default)]
pub struct FailureTracker {
    failures: DashMap<String, VecDeque<Timestamp>>,
}

impl FailureTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(window: &mut VecDeque<Timestamp>, now: Timestamp, retention: Duration) {
        while let Some(front) = window.front() {
            if now.elapsed_since(*front).to_std().unwrap_or_default() > retention {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whether `username` is currently blocked by the 5-in-5-minute rule.
    #[must_use]
    pub fn is_blocked(&self, username: &str) -> bool {
        let now = Timestamp::now();
        let Some(mut window) = self.failures.get_mut(username) else {
            return false;
        };
        Self::prune(&mut window, now, RETENTION_WINDOW);
        let recent = window.iter().filter(|ts| now.elapsed_since(**ts).to_std().unwrap_or_default() <= THRESHOLD_WINDOW).count();
        recent >= THRESHOLD_COUNT
    }

    /// Record a failed attempt for `username`.
    pub fn record_failure(&self, username: &str) {
        let now = Timestamp::now();
        let mut window = self.failures.entry(username.to_string()).or_default();
        Self::prune(&mut window, now, RETENTION_WINDOW);
        window.push_back(now);
    }

    /// Clear the failure history for `username`, called on a successful
    /// authentication.
    pub fn clear(&self, username: &str) {
        self.failures.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_five_failures_is_not_blocked() {
        let tracker = FailureTracker::new();
        for _ in 0..4 {
            tracker.record_failure("alice");
        }
        assert!(!tracker.is_blocked("alice"));
    }

    #[test]
    fn five_failures_within_five_minutes_blocks() {
        let tracker = FailureTracker::new();
        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        assert!(tracker.is_blocked("alice"));
    }

    #[test]
    fn clear_resets_the_window() {
        let tracker = FailureTracker::new();
        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        tracker.clear("alice");
        assert!(!tracker.is_blocked("alice"));
    }

    #[test]
    fn usernames_are_tracked_independently() {
        let tracker = FailureTracker::new();
        for _ in 0..5 {
            tracker.record_failure("alice");
        }
        assert!(!tracker.is_blocked("bob"));
    }
}
