//! C5: named token-bucket budgets keyed by `(budget_name, subject,
//! priority)`.
//!
//! Each bucket resets lazily: `request_tokens` compares `now` against
//! `last_reset + window_ms` on every call rather than running a background
//! timer, so an idle budget costs nothing between requests.

use cyb_core::Priority;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use cyb_telemetry::{TelemetryBus, TelemetryEvent};

use crate::error::{RateLimitError, RateLimitResult};

/// A declared budget's static shape: the limit [`Priority::Normal`]
/// requests consume from, and the window it resets on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetSpec {
    pub limit: u32,
    pub window_ms: i64,
}

impl BudgetSpec {
    #[must_use]
    pub fn new(limit: u32, window_ms: i64) -> Self {
        Self { limit, window_ms }
    }

    fn effective_limit(&self, priority: Priority) -> u32 {
        let scaled = (self.limit as f64 * priority.limit_multiplier()).round();
        scaled.max(0.0) as u32
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    consumed: u32,
    last_reset_ms: i64,
}

/// Owns every declared budget's buckets. Each `(budget, subject,
/// priority)` triple gets its own counter, scaled from the budget's base
/// limit by the priority multiplier, per spec §4.5.
pub struct RateLimiter {
    specs: DashMap<String, BudgetSpec>,
    buckets: DashMap<(String, String, Priority), BucketState>,
    telemetry: Arc<TelemetryBus>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            specs: DashMap::new(),
            buckets: DashMap::new(),
            telemetry,
        }
    }

    /// Declare (or redeclare) a budget. Safe to call at startup or at
    /// runtime; redeclaring an existing budget does not reset its buckets.
    pub fn declare_budget(&self, name: impl Into<String>, spec: BudgetSpec) {
        self.specs.insert(name.into(), spec);
    }

    /// Attempt to consume one token from `(budget, subject, priority)`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::UnknownBudget`] if `budget` was never
    /// declared, or [`RateLimitError::RateLimited`] if the bucket has no
    /// tokens left in the current window.
    pub fn request_tokens(&self, budget: &str, subject: &str, priority: Priority) -> RateLimitResult<()> {
        let spec = *self
            .specs
            .get(budget)
            .ok_or_else(|| RateLimitError::UnknownBudget(budget.to_string()))?;

        let now_ms = now_millis();
        let key = (budget.to_string(), subject.to_string(), priority);
        let mut entry = self
            .buckets
            .entry(key)
            .or_insert_with(|| BucketState {
                consumed: 0,
                last_reset_ms: now_ms,
            });

        if now_ms >= entry.last_reset_ms + spec.window_ms {
            entry.consumed = 0;
            entry.last_reset_ms = now_ms;
        }

        let limit = spec.effective_limit(priority);
        if entry.consumed >= limit {
            self.telemetry.publish(
                &TelemetryEvent::new("cyb.ratelimit.denied", "ratelimit")
                    .with_metadata("budget", budget)
                    .with_metadata("subject", subject)
                    .with_metadata("priority", priority.to_string()),
            );
            return Err(RateLimitError::RateLimited);
        }

        entry.consumed += 1;
        Ok(())
    }

    /// Current consumption for `(budget, subject, priority)`, for
    /// inspection (admin CLI, tests). Returns `0` if the bucket has never
    /// been touched.
    #[must_use]
    pub fn consumed(&self, budget: &str, subject: &str, priority: Priority) -> u32 {
        self.buckets
            .get(&(budget.to_string(), subject.to_string(), priority))
            .map(|b| b.consumed)
            .unwrap_or(0)
    }
}

fn now_millis() -> i64 {
    cyb_core::Timestamp::now().as_millis()
}

/// Convenience constant for the LLM router's shared budget name (spec
/// §4.10: `request_tokens(:s4_llm, provider, episode.priority)`).
pub const S4_LLM_BUDGET: &str = "s4_llm";

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(TelemetryBus::new()))
    }

    #[test]
    fn allows_up_to_the_limit_then_denies() {
        let rl = limiter();
        rl.declare_budget("test", BudgetSpec::new(2, 10_000));

        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
        assert_eq!(
            rl.request_tokens("test", "s", Priority::Normal),
            Err(RateLimitError::RateLimited)
        );
    }

    #[test]
    fn resets_after_window_elapses() {
        let rl = limiter();
        rl.declare_budget("test", BudgetSpec::new(2, 10));

        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
        assert!(rl.request_tokens("test", "s", Priority::Normal).is_err());

        sleep(Duration::from_millis(25));

        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
    }

    #[test]
    fn unknown_budget_is_an_error() {
        let rl = limiter();
        assert_eq!(
            rl.request_tokens("nope", "s", Priority::Normal),
            Err(RateLimitError::UnknownBudget("nope".to_string()))
        );
    }

    #[test]
    fn priority_scales_the_effective_limit() {
        let rl = limiter();
        rl.declare_budget("test", BudgetSpec::new(2, 10_000));

        // Critical gets 2x the base limit (4 tokens), independent bucket.
        for _ in 0..4 {
            assert!(rl.request_tokens("test", "s", Priority::Critical).is_ok());
        }
        assert!(rl.request_tokens("test", "s", Priority::Critical).is_err());

        // Normal's bucket is untouched by critical's consumption.
        assert!(rl.request_tokens("test", "s", Priority::Normal).is_ok());
    }

    #[test]
    fn different_subjects_have_independent_buckets() {
        let rl = limiter();
        rl.declare_budget("test", BudgetSpec::new(1, 10_000));
        assert!(rl.request_tokens("test", "a", Priority::Normal).is_ok());
        assert!(rl.request_tokens("test", "b", Priority::Normal).is_ok());
        assert!(rl.request_tokens("test", "a", Priority::Normal).is_err());
    }
}
