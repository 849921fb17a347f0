//! The LLM-driven [`cyb_vsm::PolicyDecider`] implementation: accepts an
//! explanation as a policy update once its confidence clears a threshold
//! and it names at least one recommended action, recording every decision
//! (accepted or rejected) in the meta-policy history.

use std::sync::Arc;

use async_trait::async_trait;
use cyb_llm::Explanation;
use cyb_vsm::{PolicyDecider, PolicyDecision};

use crate::evolution::MetaPolicyStore;

/// Judges S4 explanations against a confidence threshold, same rule as
/// [`cyb_vsm::ConfidenceThresholdDecider`], but additionally keeps the
/// governance history in [`MetaPolicyStore`] so accepted and rejected
/// explanations are both auditable, not just the ones that won.
pub struct LlmGovernedDecider {
    threshold: f64,
    store: Arc<MetaPolicyStore>,
}

impl LlmGovernedDecider {
    #[must_use]
    pub fn new(threshold: f64, store: Arc<MetaPolicyStore>) -> Self {
        Self { threshold, store }
    }
}

#[async_trait]
impl PolicyDecider for LlmGovernedDecider {
    async fn decide(&self, explanation: &Explanation) -> PolicyDecision {
        let name = explanation.episode_id.to_string();
        let document = serde_json::json!({
            "summary": explanation.summary,
            "recommended_actions": explanation.recommended_actions,
            "confidence": explanation.confidence,
        });

        if explanation.confidence >= self.threshold && !explanation.recommended_actions.is_empty() {
            self.store.record_acceptance(name.clone(), document.clone(), explanation.summary.clone());
            PolicyDecision {
                accept: true,
                policy_name: name,
                document,
            }
        } else {
            let reason = if explanation.recommended_actions.is_empty() {
                "no recommended actions".to_string()
            } else {
                format!("confidence {:.2} below threshold {:.2}", explanation.confidence, self.threshold)
            };
            self.store.record_rejection(name.clone(), reason);
            PolicyDecision {
                accept: false,
                policy_name: name,
                document,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_core::EpisodeId;
    use cyb_vsm::PolicyCache;

    fn explanation(confidence: f64, actions: Vec<&str>) -> Explanation {
        Explanation {
            episode_id: EpisodeId::new(),
            summary: "s".to_string(),
            root_cause: None,
            impact: None,
            recommended_actions: actions.into_iter().map(str::to_string).collect(),
            confidence,
            sop_references: Vec::new(),
        }
    }

    #[tokio::test]
    async fn accepted_decision_is_recorded() {
        let store = Arc::new(MetaPolicyStore::new(Arc::new(PolicyCache::new())));
        let decider = LlmGovernedDecider::new(0.75, Arc::clone(&store));
        let e = explanation(0.9, vec!["restart"]);

        let decision = decider.decide(&e).await;

        assert!(decision.accept);
        assert_eq!(store.history_for(&e.episode_id.to_string()).len(), 1);
    }

    #[tokio::test]
    async fn rejected_decision_is_also_recorded() {
        let store = Arc::new(MetaPolicyStore::new(Arc::new(PolicyCache::new())));
        let decider = LlmGovernedDecider::new(0.75, Arc::clone(&store));
        let e = explanation(0.2, vec!["restart"]);

        let decision = decider.decide(&e).await;

        assert!(!decision.accept);
        assert_eq!(store.history_for(&e.episode_id.to_string()).len(), 1);
    }
}
