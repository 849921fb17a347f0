//! S3's policy cache (spec §4.11): the versioned store S5/C12 pushes
//! accepted policy updates into, consulted by S3's compliance checker.

use dashmap::DashMap;
use serde_json::Value;

/// One named policy's current version and document.
#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub version: u64,
    pub document: Value,
}

/// Owns every named policy's latest version. Pushing a policy with the
/// same name bumps its version rather than requiring the caller to track
/// it.
pub struct PolicyCache {
    policies: DashMap<String, PolicyRecord>,
}

impl PolicyCache {
    #[must_use]
    pub fn new() -> Self {
        Self { policies: DashMap::new() }
    }

    /// Push an update for `name`, returning the new version number.
    pub fn push(&self, name: impl Into<String>, document: Value) -> u64 {
        let name = name.into();
        let mut entry = self.policies.entry(name).or_insert(PolicyRecord { version: 0, document: Value::Null });
        entry.version += 1;
        entry.document = document;
        entry.version
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<PolicyRecord> {
        self.policies.get(name).map(|e| e.value().clone())
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.policies.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushing_a_policy_twice_bumps_its_version() {
        let cache = PolicyCache::new();
        assert_eq!(cache.push("rate_limits", serde_json::json!({"a": 1})), 1);
        assert_eq!(cache.push("rate_limits", serde_json::json!({"a": 2})), 2);
        assert_eq!(cache.get("rate_limits").unwrap().version, 2);
    }

    #[test]
    fn unknown_policy_is_none() {
        let cache = PolicyCache::new();
        assert!(cache.get("nope").is_none());
    }
}
