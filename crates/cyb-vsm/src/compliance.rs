//! S3's periodic compliance checker (spec §4.11): re-evaluates every
//! cached policy and records a breaker failure against any service a
//! non-compliant policy names, so the breaker starts shedding calls to it
//! ahead of the next intervention cycle.

use std::sync::Arc;
use std::time::Duration;

use cyb_breaker::CircuitBreaker;
use cyb_telemetry::{TelemetryBus, TelemetryEvent};

use crate::policy_cache::PolicyCache;

/// A policy document is non-compliant when it carries `"compliant":
/// false`; absence of the field is treated as compliant.
fn is_compliant(document: &serde_json::Value) -> bool {
    document.get("compliant").and_then(|v| v.as_bool()).unwrap_or(true)
}

/// Owns the periodic sweep over [`PolicyCache`], modeled on
/// [`cyb_cache::DeterministicCache::spawn_sweeper`]'s idiom.
pub struct ComplianceChecker {
    policy_cache: Arc<PolicyCache>,
    breaker: Arc<CircuitBreaker>,
    telemetry: Arc<TelemetryBus>,
}

impl ComplianceChecker {
    #[must_use]
    pub fn new(policy_cache: Arc<PolicyCache>, breaker: Arc<CircuitBreaker>, telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            policy_cache,
            breaker,
            telemetry,
        }
    }

    /// Run one compliance pass, returning the names of policies found
    /// non-compliant.
    pub fn check_once(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for name in self.policy_cache.names() {
            let Some(record) = self.policy_cache.get(&name) else { continue };
            if is_compliant(&record.document) {
                continue;
            }
            self.breaker.record_failure(&name);
            self.telemetry.publish(
                &TelemetryEvent::new("cyb.vsm.s3.compliance_violation", "s3")
                    .with_metadata("policy_name", name.as_str())
                    .with_measurement("version", record.version as f64),
            );
            violations.push(name);
        }
        violations
    }

    /// Spawn a background task that calls [`Self::check_once`] every
    /// `interval` until the returned handle is dropped or aborted.
    #[must_use]
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let checker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                checker.check_once();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> (Arc<PolicyCache>, Arc<CircuitBreaker>, ComplianceChecker) {
        let policy_cache = Arc::new(PolicyCache::new());
        let telemetry = Arc::new(TelemetryBus::new());
        let breaker = Arc::new(CircuitBreaker::new(Arc::clone(&telemetry)));
        let checker = ComplianceChecker::new(Arc::clone(&policy_cache), Arc::clone(&breaker), telemetry);
        (policy_cache, breaker, checker)
    }

    #[test]
    fn compliant_policy_produces_no_violation() {
        let (cache, _breaker, checker) = checker();
        cache.push("rate_limits", serde_json::json!({"compliant": true}));
        assert!(checker.check_once().is_empty());
    }

    #[test]
    fn non_compliant_policy_is_reported_and_breaks_its_service() {
        let (cache, breaker, checker) = checker();
        cache.push("egress_policy", serde_json::json!({"compliant": false}));

        let violations = checker.check_once();

        assert_eq!(violations, vec!["egress_policy".to_string()]);
        assert_eq!(breaker.snapshot("egress_policy").failure_count, 1);
    }

    #[test]
    fn policy_with_no_compliant_field_is_treated_as_compliant() {
        let (cache, _breaker, checker) = checker();
        cache.push("untagged", serde_json::json!({"other": 1}));
        assert!(checker.check_once().is_empty());
    }
}
