//! Meta-policy evolution: a versioned log of every proposal governance
//! has decided on, layered over [`cyb_vsm::PolicyCache`] (the document S3
//! actually enforces).

use std::sync::Arc;

use cyb_core::Timestamp;
use cyb_vsm::PolicyCache;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{PolicyError, PolicyResult};
use crate::proposal::{PolicyProposal, ProposalOutcome};

/// One decided proposal, kept for the governance history.
#[derive(Debug, Clone)]
pub struct ProposalRecord {
    pub proposal_id: Uuid,
    pub name: String,
    pub outcome: ProposalOutcome,
    pub decided_at: Timestamp,
    pub explanation_summary: String,
}

/// Owns the accepted-policy cache S3 reads from, plus the full decision
/// history (accepted and rejected) for every proposal seen.
pub struct MetaPolicyStore {
    policy_cache: Arc<PolicyCache>,
    history: DashMap<Uuid, ProposalRecord>,
}

impl MetaPolicyStore {
    #[must_use]
    pub fn new(policy_cache: Arc<PolicyCache>) -> Self {
        Self {
            policy_cache,
            history: DashMap::new(),
        }
    }

    /// Accept `proposal`, pushing its document into the live policy cache
    /// and recording the decision.
    pub fn accept(&self, proposal: &PolicyProposal, explanation_summary: impl Into<String>) -> u64 {
        let version = self.policy_cache.push(proposal.name.clone(), proposal.document.clone());
        self.history.insert(
            proposal.id,
            ProposalRecord {
                proposal_id: proposal.id,
                name: proposal.name.clone(),
                outcome: ProposalOutcome::Accepted { version },
                decided_at: Timestamp::now(),
                explanation_summary: explanation_summary.into(),
            },
        );
        version
    }

    /// Reject `proposal`, recording the decision without touching the
    /// live policy cache.
    pub fn reject(&self, proposal: &PolicyProposal, reason: impl Into<String>) {
        self.history.insert(
            proposal.id,
            ProposalRecord {
                proposal_id: proposal.id,
                name: proposal.name.clone(),
                outcome: ProposalOutcome::Rejected { reason: reason.into() },
                decided_at: Timestamp::now(),
                explanation_summary: String::new(),
            },
        );
    }

    /// Record acceptance of a bus-originated policy update (spec §4.11's
    /// S5 cascade) that never went through a [`PolicyProposal`] — there is
    /// no proposer to attribute it to, only the explanation that produced
    /// it. Returns the generated decision id and the new policy version.
    pub fn record_acceptance(
        &self,
        name: impl Into<String>,
        document: serde_json::Value,
        explanation_summary: impl Into<String>,
    ) -> (Uuid, u64) {
        let name = name.into();
        let version = self.policy_cache.push(name.clone(), document);
        let id = Uuid::new_v4();
        self.history.insert(
            id,
            ProposalRecord {
                proposal_id: id,
                name,
                outcome: ProposalOutcome::Accepted { version },
                decided_at: Timestamp::now(),
                explanation_summary: explanation_summary.into(),
            },
        );
        (id, version)
    }

    /// Record rejection of a bus-originated explanation without touching
    /// the live policy cache. Returns the generated decision id.
    pub fn record_rejection(&self, name: impl Into<String>, reason: impl Into<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.history.insert(
            id,
            ProposalRecord {
                proposal_id: id,
                name: name.into(),
                outcome: ProposalOutcome::Rejected { reason: reason.into() },
                decided_at: Timestamp::now(),
                explanation_summary: String::new(),
            },
        );
        id
    }

    /// The decision recorded for `proposal_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownProposal`] if no decision was ever
    /// recorded for that id.
    pub fn decision(&self, proposal_id: Uuid) -> PolicyResult<ProposalRecord> {
        self.history
            .get(&proposal_id)
            .map(|e| e.value().clone())
            .ok_or(PolicyError::UnknownProposal(proposal_id))
    }

    /// Every decision recorded for policies named `name`, most recent
    /// first.
    #[must_use]
    pub fn history_for(&self, name: &str) -> Vec<ProposalRecord> {
        let mut records: Vec<_> = self
            .history
            .iter()
            .filter(|e| e.value().name == name)
            .map(|e| e.value().clone())
            .collect();
        records.sort_by(|a, b| b.decided_at.cmp(&a.decided_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_core::TenantId;

    fn proposal(name: &str) -> PolicyProposal {
        PolicyProposal::new(TenantId::new(), name, serde_json::json!({"a": 1}), "because")
    }

    #[test]
    fn accepting_pushes_into_the_live_policy_cache() {
        let cache = Arc::new(PolicyCache::new());
        let store = MetaPolicyStore::new(Arc::clone(&cache));
        let p = proposal("egress");

        let version = store.accept(&p, "looks fine");

        assert_eq!(version, 1);
        assert_eq!(cache.get("egress").unwrap().version, 1);
        assert!(matches!(
            store.decision(p.id).unwrap().outcome,
            ProposalOutcome::Accepted { version: 1 }
        ));
    }

    #[test]
    fn rejecting_leaves_the_live_policy_cache_untouched() {
        let cache = Arc::new(PolicyCache::new());
        let store = MetaPolicyStore::new(Arc::clone(&cache));
        let p = proposal("egress");

        store.reject(&p, "violates data residency");

        assert!(cache.get("egress").is_none());
        assert!(matches!(
            store.decision(p.id).unwrap().outcome,
            ProposalOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn unknown_proposal_is_an_error() {
        let store = MetaPolicyStore::new(Arc::new(PolicyCache::new()));
        assert!(matches!(store.decision(Uuid::new_v4()), Err(PolicyError::UnknownProposal(_))));
    }

    #[test]
    fn record_acceptance_pushes_without_a_proposal() {
        let cache = Arc::new(PolicyCache::new());
        let store = MetaPolicyStore::new(Arc::clone(&cache));

        let (id, version) = store.record_acceptance("rate_limits", serde_json::json!({"a": 1}), "s4 said so");

        assert_eq!(version, 1);
        assert_eq!(cache.get("rate_limits").unwrap().version, 1);
        assert!(matches!(
            store.decision(id).unwrap().outcome,
            ProposalOutcome::Accepted { version: 1 }
        ));
    }

    #[test]
    fn history_for_returns_most_recent_first() {
        let cache = Arc::new(PolicyCache::new());
        let store = MetaPolicyStore::new(cache);
        let first = proposal("egress");
        store.accept(&first, "v1");
        let second = proposal("egress");
        store.accept(&second, "v2");

        let history = store.history_for("egress");
        assert_eq!(history.len(), 2);
    }
}
