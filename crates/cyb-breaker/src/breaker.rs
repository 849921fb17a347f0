//! C6: per-service closed/open/half-open circuit breaker.
//!
//! `closed` lets calls through while counting failures in a sliding
//! window; `open` short-circuits until `next_probe_at`; `half_open` grants
//! exactly one probe and decides the next state from its outcome, doubling
//! the cooldown on a failed probe.

use cyb_core::Timestamp;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use cyb_telemetry::{TelemetryBus, TelemetryEvent};

use crate::error::BreakerError;

/// The three states a breaker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStateKind {
    Closed,
    Open,
    HalfOpen,
}

/// Tuning for one service's breaker.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub window_ms: i64,
    pub base_cooldown_ms: i64,
    pub max_cooldown_ms: i64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window_ms: 60_000,
            base_cooldown_ms: 10_000,
            max_cooldown_ms: 300_000,
        }
    }
}

struct BreakerEntry {
    config: BreakerConfig,
    state: BreakerStateKind,
    failures: VecDeque<Timestamp>,
    cooldown_ms: i64,
    next_probe_at: Option<Timestamp>,
}

impl BreakerEntry {
    fn new(config: BreakerConfig) -> Self {
        let cooldown_ms = config.base_cooldown_ms;
        Self {
            config,
            state: BreakerStateKind::Closed,
            failures: VecDeque::new(),
            cooldown_ms,
            next_probe_at: None,
        }
    }

    fn prune_failures(&mut self, now: Timestamp) {
        let window = self.config.window_ms;
        while let Some(&front) = self.failures.front() {
            if now.elapsed_since(front).num_milliseconds() > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Snapshot of a single service's breaker, for inspection (admin CLI,
/// tests, telemetry metadata).
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    pub service_id: String,
    pub state: BreakerStateKind,
    pub failure_count: u32,
    pub next_probe_at: Option<Timestamp>,
}

/// Owns every service's breaker state.
pub struct CircuitBreaker {
    entries: DashMap<String, BreakerEntry>,
    default_config: BreakerConfig,
    telemetry: Arc<TelemetryBus>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            entries: DashMap::new(),
            default_config: BreakerConfig::default(),
            telemetry,
        }
    }

    #[must_use]
    pub fn with_default_config(mut self, config: BreakerConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Declare non-default tuning for `service_id` ahead of first use.
    pub fn configure(&self, service_id: impl Into<String>, config: BreakerConfig) {
        self.entries
            .entry(service_id.into())
            .or_insert_with(|| BreakerEntry::new(config))
            .config = config;
    }

    fn emit_transition(&self, service_id: &str, state: BreakerStateKind) {
        let name = match state {
            BreakerStateKind::Closed => "closed",
            BreakerStateKind::Open => "open",
            BreakerStateKind::HalfOpen => "half_open",
        };
        self.telemetry.publish(
            &TelemetryEvent::new("cyb.breaker.transition", "breaker")
                .with_metadata("service_id", service_id)
                .with_metadata("state", name),
        );
    }

    /// Whether a call to `service_id` is currently permitted. Transitions
    /// `open` to `half_open` (granting exactly one probe) once the cooldown
    /// has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError::CircuitOpen`] if calls are currently
    /// short-circuited.
    pub fn allow(&self, service_id: &str) -> Result<(), BreakerError> {
        let now = Timestamp::now();
        let mut entry = self
            .entries
            .entry(service_id.to_string())
            .or_insert_with(|| BreakerEntry::new(self.default_config));

        match entry.state {
            BreakerStateKind::Closed => Ok(()),
            BreakerStateKind::HalfOpen => Err(BreakerError::CircuitOpen),
            BreakerStateKind::Open => {
                let ready = entry.next_probe_at.is_some_and(|at| now >= at);
                if ready {
                    entry.state = BreakerStateKind::HalfOpen;
                    drop(entry);
                    self.emit_transition(service_id, BreakerStateKind::HalfOpen);
                    Ok(())
                } else {
                    Err(BreakerError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful call. From `half_open`, closes the breaker and
    /// resets its cooldown to the configured base.
    pub fn record_success(&self, service_id: &str) {
        let mut entry = self
            .entries
            .entry(service_id.to_string())
            .or_insert_with(|| BreakerEntry::new(self.default_config));
        let was_open_or_half = entry.state != BreakerStateKind::Closed;
        entry.state = BreakerStateKind::Closed;
        entry.failures.clear();
        entry.cooldown_ms = entry.config.base_cooldown_ms;
        entry.next_probe_at = None;
        drop(entry);
        if was_open_or_half {
            self.emit_transition(service_id, BreakerStateKind::Closed);
        }
    }

    /// Record a failed call. From `closed`, counts toward the sliding
    /// failure window and opens the breaker once the threshold is met.
    /// From `half_open`, the probe failed: reopen with doubled cooldown.
    pub fn record_failure(&self, service_id: &str) {
        let now = Timestamp::now();
        let mut entry = self
            .entries
            .entry(service_id.to_string())
            .or_insert_with(|| BreakerEntry::new(self.default_config));

        match entry.state {
            BreakerStateKind::HalfOpen => {
                entry.cooldown_ms = (entry.cooldown_ms * 2).min(entry.config.max_cooldown_ms);
                entry.state = BreakerStateKind::Open;
                entry.next_probe_at = Some(now.plus_millis(entry.cooldown_ms));
                entry.failures.clear();
                drop(entry);
                self.emit_transition(service_id, BreakerStateKind::Open);
            }
            BreakerStateKind::Open => {
                // A failure reported while already open (e.g. a caller
                // that didn't check `allow` first) just extends nothing;
                // the existing cooldown stands.
            }
            BreakerStateKind::Closed => {
                entry.prune_failures(now);
                entry.failures.push_back(now);
                if entry.failures.len() as u32 >= entry.config.failure_threshold {
                    entry.state = BreakerStateKind::Open;
                    entry.cooldown_ms = entry.config.base_cooldown_ms;
                    entry.next_probe_at = Some(now.plus_millis(entry.cooldown_ms));
                    drop(entry);
                    self.emit_transition(service_id, BreakerStateKind::Open);
                }
            }
        }
    }

    /// Current snapshot for `service_id`, defaulting to `closed` with zero
    /// failures if never touched.
    #[must_use]
    pub fn snapshot(&self, service_id: &str) -> BreakerSnapshot {
        self.entries
            .get(service_id)
            .map(|e| BreakerSnapshot {
                service_id: service_id.to_string(),
                state: e.state,
                failure_count: e.failures.len() as u32,
                next_probe_at: e.next_probe_at,
            })
            .unwrap_or(BreakerSnapshot {
                service_id: service_id.to_string(),
                state: BreakerStateKind::Closed,
                failure_count: 0,
                next_probe_at: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(Arc::new(TelemetryBus::new())).with_default_config(BreakerConfig {
            failure_threshold: 3,
            window_ms: 60_000,
            base_cooldown_ms: 50,
            max_cooldown_ms: 10_000,
        })
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let cb = breaker();
        for _ in 0..3 {
            assert!(cb.allow("svc").is_ok());
            cb.record_failure("svc");
        }
        assert_eq!(cb.allow("svc"), Err(BreakerError::CircuitOpen));
        assert_eq!(cb.snapshot("svc").state, BreakerStateKind::Open);
    }

    #[test]
    fn half_open_grants_exactly_one_probe() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure("svc");
        }
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(cb.allow("svc").is_ok());
        // Second call while the first probe's result is still pending.
        assert_eq!(cb.allow("svc"), Err(BreakerError::CircuitOpen));
    }

    #[test]
    fn successful_probe_closes_the_breaker() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure("svc");
        }
        std::thread::sleep(std::time::Duration::from_millis(60));
        cb.allow("svc").unwrap();
        cb.record_success("svc");
        assert_eq!(cb.snapshot("svc").state, BreakerStateKind::Closed);
        assert!(cb.allow("svc").is_ok());
    }

    #[test]
    fn failed_probe_reopens_with_doubled_cooldown() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure("svc");
        }
        std::thread::sleep(std::time::Duration::from_millis(60));
        cb.allow("svc").unwrap();
        cb.record_failure("svc");
        assert_eq!(cb.snapshot("svc").state, BreakerStateKind::Open);

        // Base cooldown was 50ms; doubled is 100ms, so 60ms isn't enough.
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert_eq!(cb.allow("svc"), Err(BreakerError::CircuitOpen));
    }

    #[test]
    fn closed_breaker_always_allows() {
        let cb = breaker();
        assert!(cb.allow("fresh-service").is_ok());
    }
}
