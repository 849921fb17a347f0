//! S5 Policy: receives explanations from S4 and decides whether they
//! warrant a policy update cascaded back to S3 (spec §4.11). The decision
//! itself is a pluggable seam so governance logic (C12) can own it.

use std::sync::Arc;

use async_trait::async_trait;
use cyb_bus::{AckOutcome, Envelope, Handler, InMemoryMessageBus};
use cyb_llm::Explanation;
use tracing::warn;

/// The decision S5 reaches about an incoming explanation: whether it
/// justifies a policy update, and if so under what name and document.
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub accept: bool,
    pub policy_name: String,
    pub document: serde_json::Value,
}

/// The seam S4's output is judged through. `cyb-policy` supplies the
/// LLM-driven implementation; this crate ships a confidence-threshold
/// reference implementation so S5 is usable standalone.
#[async_trait]
pub trait PolicyDecider: Send + Sync {
    /// Decide what, if anything, to do with `explanation`.
    async fn decide(&self, explanation: &Explanation) -> PolicyDecision;
}

/// Accepts an explanation as a policy update whenever its confidence
/// clears [`Self::threshold`] and it names at least one recommended
/// action, naming the policy after the episode it was produced for.
pub struct ConfidenceThresholdDecider {
    threshold: f64,
}

impl ConfidenceThresholdDecider {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ConfidenceThresholdDecider {
    fn default() -> Self {
        Self::new(0.75)
    }
}

#[async_trait]
impl PolicyDecider for ConfidenceThresholdDecider {
    async fn decide(&self, explanation: &Explanation) -> PolicyDecision {
        let accept = explanation.confidence >= self.threshold && !explanation.recommended_actions.is_empty();
        PolicyDecision {
            accept,
            policy_name: explanation.episode_id.to_string(),
            document: serde_json::json!({
                "summary": explanation.summary,
                "recommended_actions": explanation.recommended_actions,
                "confidence": explanation.confidence,
            }),
        }
    }
}

/// S5's handler: runs every `vsm.s5.explanation` through a
/// [`PolicyDecider`] and publishes accepted decisions to
/// `vsm.s3.policy_update`.
pub struct S5Handler {
    bus: Arc<InMemoryMessageBus>,
    decider: Arc<dyn PolicyDecider>,
}

impl S5Handler {
    #[must_use]
    pub fn new(bus: Arc<InMemoryMessageBus>, decider: Arc<dyn PolicyDecider>) -> Self {
        Self { bus, decider }
    }
}

#[async_trait]
impl Handler for S5Handler {
    async fn handle(&self, envelope: Envelope) -> AckOutcome {
        if envelope.message_type != "vsm.s5.explanation" {
            return AckOutcome::Ack;
        }

        let explanation: Explanation = match serde_json::from_value(envelope.payload.clone()) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "s5: malformed explanation payload");
                return AckOutcome::Ack;
            }
        };

        let decision = self.decider.decide(&explanation).await;
        if !decision.accept {
            return AckOutcome::Ack;
        }

        let payload = serde_json::json!({
            "policy_name": decision.policy_name,
            "document": decision.document,
        });
        let next = Envelope::new("vsm.s3.policy_update", payload, envelope.tenant_id)
            .with_correlation_id(envelope.correlation_id);

        match self.bus.publish("cyb", "vsm.s3.policy_update", next).await {
            Ok(()) => AckOutcome::Ack,
            Err(e) => {
                warn!(error = %e, "s5: failed to cascade policy update");
                AckOutcome::Nack
            }
        }
    }
}
