//! `Hook` definition: pattern, threshold, and action (spec §3, §4.8).

use cyb_core::{HookId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matcher::Matcher;

/// `key -> matcher`; every declared key must be satisfied for the pattern
/// to match. A `BTreeMap` so two patterns built from the same keys compare
/// and serialize deterministically.
pub type Pattern = BTreeMap<String, Matcher>;

/// Count and/or rate threshold a hook's window must reach before its
/// action fires (spec §3 `Hook.threshold`). At least one of `count` or
/// `rate_per_min` should be set; a hook with neither never fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Threshold {
    pub count: Option<u32>,
    pub rate_per_min: Option<f64>,
    pub window_ms: i64,
}

impl Threshold {
    #[must_use]
    pub fn by_count(count: u32, window_ms: i64) -> Self {
        Self {
            count: Some(count),
            rate_per_min: None,
            window_ms,
        }
    }

    #[must_use]
    pub fn by_rate(rate_per_min: f64, window_ms: i64) -> Self {
        Self {
            count: None,
            rate_per_min: Some(rate_per_min),
            window_ms,
        }
    }
}

/// What happens when a hook's threshold is satisfied (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Enqueue a named workflow run.
    Workflow { name: String },
    /// Dispatch to a notification channel.
    Notify { channel: String },
    /// Record at the given level (`"info"`, `"warning"`, `"error"`, ...).
    Log { level: String },
    /// Invoke a registered two-argument callback by name.
    Callback { name: String },
}

/// A registered CEP hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hook {
    pub id: HookId,
    pub name: String,
    pub pattern: Pattern,
    pub threshold: Option<Threshold>,
    pub action: Action,
    pub enabled: bool,
    pub triggered_count: u64,
    pub last_triggered: Option<Timestamp>,
}

impl Hook {
    /// Build a new, enabled hook with zeroed trigger state.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: Pattern, threshold: Option<Threshold>, action: Action) -> Self {
        Self {
            id: HookId::new(),
            name: name.into(),
            pattern,
            threshold,
            action,
            enabled: true,
            triggered_count: 0,
            last_triggered: None,
        }
    }

    /// Whether `event` satisfies every declared matcher in this hook's
    /// pattern. An empty pattern matches everything.
    #[must_use]
    pub fn pattern_matches(&self, event: &serde_json::Value) -> bool {
        self.pattern
            .iter()
            .all(|(key, matcher)| matcher.is_satisfied_by(event.get(key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use serde_json::json;

    #[test]
    fn empty_pattern_matches_any_event() {
        let hook = Hook::new("any", Pattern::new(), None, Action::Log { level: "info".into() });
        assert!(hook.pattern_matches(&json!({"whatever": 1})));
    }

    #[test]
    fn pattern_requires_every_key_to_match() {
        let mut pattern = Pattern::new();
        pattern.insert("type".to_string(), Matcher::Eq(json!("error")));
        pattern.insert("severity".to_string(), Matcher::severity_gte(cyb_core::Severity::High));
        let hook = Hook::new("errors", pattern, None, Action::Log { level: "warning".into() });

        assert!(hook.pattern_matches(&json!({"type": "error", "severity": "high"})));
        assert!(!hook.pattern_matches(&json!({"type": "error", "severity": "low"})));
        assert!(!hook.pattern_matches(&json!({"type": "info"})));
    }
}
