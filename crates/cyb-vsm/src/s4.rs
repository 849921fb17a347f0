//! S4 Intelligence: wraps the LLM router, turning an analysis request
//! forwarded by S3 into an [`Explanation`] cascaded on to S5 (spec §4.10,
//! §4.11).

use std::sync::Arc;

use async_trait::async_trait;
use cyb_bus::{AckOutcome, Envelope, Handler, InMemoryMessageBus};
use cyb_llm::{AnalyzeOpts, Episode, EpisodeKind, Explanation, LlmError, Router};
use tracing::warn;

/// S4's handler: deserializes the episode carried in `vsm.s4.analyze`,
/// routes it through the LLM router, and forwards the result to S5.
pub struct S4Handler {
    bus: Arc<InMemoryMessageBus>,
    router: Arc<Router>,
}

impl S4Handler {
    #[must_use]
    pub fn new(bus: Arc<InMemoryMessageBus>, router: Arc<Router>) -> Self {
        Self { bus, router }
    }
}

fn episode_kind(raw: &str) -> EpisodeKind {
    match raw {
        "policy_review" => EpisodeKind::PolicyReview,
        "code_gen" => EpisodeKind::CodeGen,
        "anomaly_detection" => EpisodeKind::AnomalyDetection,
        "compliance_check" => EpisodeKind::ComplianceCheck,
        "optimization" => EpisodeKind::Optimization,
        "prediction" => EpisodeKind::Prediction,
        "classification" => EpisodeKind::Classification,
        _ => EpisodeKind::RootCause,
    }
}

fn episode_from_envelope(envelope: &Envelope) -> Episode {
    let kind = envelope
        .payload
        .get("kind")
        .and_then(|v| v.as_str())
        .map(episode_kind)
        .unwrap_or(EpisodeKind::RootCause);
    let title = envelope
        .payload
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("untitled")
        .to_string();
    let payload = envelope.payload.get("payload").cloned().unwrap_or(serde_json::Value::Null);
    Episode::new(envelope.tenant_id, kind, title, payload)
}

fn degraded_explanation(episode: &Episode) -> Explanation {
    Explanation {
        episode_id: episode.id,
        summary: "analysis unavailable: every provider in the chain failed".to_string(),
        root_cause: None,
        impact: None,
        recommended_actions: Vec::new(),
        confidence: 0.0,
        sop_references: Vec::new(),
    }
}

#[async_trait]
impl Handler for S4Handler {
    async fn handle(&self, envelope: Envelope) -> AckOutcome {
        if envelope.message_type != "vsm.s4.analyze" {
            return AckOutcome::Ack;
        }

        let episode = episode_from_envelope(&envelope);
        let prompt = episode.title.clone();
        let opts = AnalyzeOpts::new(prompt);

        let explanation = match self.router.analyze(&episode, opts).await {
            Ok((output, _meta)) => Explanation {
                episode_id: episode.id,
                summary: output.text,
                root_cause: None,
                impact: None,
                recommended_actions: Vec::new(),
                confidence: output.confidence.unwrap_or(0.5),
                sop_references: Vec::new(),
            },
            Err(LlmError::AllProvidersFailed) => degraded_explanation(&episode),
            Err(e) => {
                warn!(error = %e, "s4: analysis failed");
                degraded_explanation(&episode)
            }
        };

        let payload = serde_json::to_value(&explanation).unwrap_or(serde_json::Value::Null);
        let next = Envelope::new("vsm.s5.explanation", payload, envelope.tenant_id)
            .with_correlation_id(envelope.correlation_id);

        match self.bus.publish("cyb", "vsm.s5.explanation", next).await {
            Ok(()) => AckOutcome::Ack,
            Err(e) => {
                warn!(error = %e, "s4: failed to forward explanation to s5");
                AckOutcome::Nack
            }
        }
    }
}
