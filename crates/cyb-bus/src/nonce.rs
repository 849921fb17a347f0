//! Time-bounded replay cache keyed by `(tenant_id, nonce)` (spec §3,
//! message envelope invariant).

use cyb_core::TenantId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Retains seen `(tenant_id, nonce)` pairs for `window` before forgetting
/// them, bounding memory while still catching redeliveries from the
/// broker's at-least-once retry path.
pub struct ReplayCache {
    seen: HashMap<(TenantId, Uuid), Instant>,
    window: Duration,
    last_sweep: Instant,
    sweep_interval: Duration,
}

impl ReplayCache {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
            last_sweep: Instant::now(),
            sweep_interval: window / 4,
        }
    }

    /// Record `(tenant_id, nonce)` if unseen within the window, returning
    /// `true` for a fresh message and `false` for a duplicate.
    pub fn check_and_record(&mut self, tenant_id: TenantId, nonce: Uuid) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_sweep) >= self.sweep_interval {
            self.sweep(now);
            self.last_sweep = now;
        }

        let key = (tenant_id, nonce);
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }

    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.seen.retain(|_, seen_at| now.duration_since(*seen_at) < window);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_fresh() {
        let mut cache = ReplayCache::new(Duration::from_secs(60));
        assert!(cache.check_and_record(TenantId::new(), Uuid::new_v4()));
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut cache = ReplayCache::new(Duration::from_secs(60));
        let tenant = TenantId::new();
        let nonce = Uuid::new_v4();
        assert!(cache.check_and_record(tenant, nonce));
        assert!(!cache.check_and_record(tenant, nonce));
    }

    #[test]
    fn same_nonce_different_tenant_is_not_a_duplicate() {
        let mut cache = ReplayCache::new(Duration::from_secs(60));
        let nonce = Uuid::new_v4();
        assert!(cache.check_and_record(TenantId::new(), nonce));
        assert!(cache.check_and_record(TenantId::new(), nonce));
    }
}
