//! S2 coordination state (spec §4.11): per-workflow attention weights.
//! Focusing a workflow multiplies its weight and refreshes `last_seen`;
//! S2 publishes the resulting decision on to S3.

use cyb_core::Timestamp;
use dashmap::DashMap;

/// A workflow's current attention weight and when it was last focused.
#[derive(Debug, Clone, Copy)]
pub struct AttentionEntry {
    pub weight: f64,
    pub last_seen: Timestamp,
}

/// Multiplier applied to a workflow's weight each time it is focused.
const FOCUS_MULTIPLIER: f64 = 1.5;

/// Ceiling a workflow's weight saturates at, so repeated focusing cannot
/// grow it unboundedly.
const MAX_WEIGHT: f64 = 100.0;

/// Owns every workflow's attention weight. A workflow absent from the map
/// has the baseline weight `1.0`.
pub struct CoordinationState {
    weights: DashMap<String, AttentionEntry>,
}

impl CoordinationState {
    #[must_use]
    pub fn new() -> Self {
        Self { weights: DashMap::new() }
    }

    /// Focus `workflow_id`: multiply its weight by [`FOCUS_MULTIPLIER`]
    /// (seeding at `1.0` on first focus) and refresh `last_seen`.
    pub fn focus(&self, workflow_id: impl Into<String>) -> AttentionEntry {
        let mut entry = self
            .weights
            .entry(workflow_id.into())
            .or_insert(AttentionEntry {
                weight: 1.0,
                last_seen: Timestamp::now(),
            });
        entry.weight = (entry.weight * FOCUS_MULTIPLIER).min(MAX_WEIGHT);
        entry.last_seen = Timestamp::now();
        *entry
    }

    /// Current weight for `workflow_id`, or the baseline `1.0` if it has
    /// never been focused.
    #[must_use]
    pub fn weight(&self, workflow_id: &str) -> f64 {
        self.weights.get(workflow_id).map(|e| e.weight).unwrap_or(1.0)
    }

    /// Every tracked workflow, most heavily weighted first, for the
    /// coordination decision S2 publishes to S3.
    #[must_use]
    pub fn ranked(&self) -> Vec<(String, AttentionEntry)> {
        let mut entries: Vec<_> = self.weights.iter().map(|e| (e.key().clone(), *e.value())).collect();
        entries.sort_by(|a, b| b.1.weight.partial_cmp(&a.1.weight).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }
}

impl Default for CoordinationState {
    fn default() -> Self {
        Self::new()
    }
}
