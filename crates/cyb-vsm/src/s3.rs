//! S3 Control: the tier algedonic signals bypass to directly, hosting the
//! global state machine, interventions, and the policy cache S5 pushes
//! into (spec §4.11). Forwards sufficiently weighted coordination work on
//! to S4 for analysis.

use std::sync::Arc;

use async_trait::async_trait;
use cyb_bus::{AckOutcome, Envelope, Handler, InMemoryMessageBus};
use tracing::warn;

use crate::intervention::{InterventionKind, InterventionLog};
use crate::policy_cache::PolicyCache;
use crate::signal::SignalKind;
use crate::state::{GlobalState, S3StateMachine};

/// A coordination weight at or above this forwards the workflow to S4 for
/// analysis rather than being handled as routine.
const ANALYSIS_WEIGHT_THRESHOLD: f64 = 4.0;

/// S3's handler, dispatching on the routing key's final segment
/// (`algedonic`, `sync`, `policy_update`, `status_request`).
pub struct S3Handler {
    bus: Arc<InMemoryMessageBus>,
    state_machine: Arc<S3StateMachine>,
    interventions: Arc<InterventionLog>,
    policy_cache: Arc<PolicyCache>,
}

impl S3Handler {
    #[must_use]
    pub fn new(
        bus: Arc<InMemoryMessageBus>,
        state_machine: Arc<S3StateMachine>,
        interventions: Arc<InterventionLog>,
        policy_cache: Arc<PolicyCache>,
    ) -> Self {
        Self {
            bus,
            state_machine,
            interventions,
            policy_cache,
        }
    }

    async fn handle_algedonic(&self, envelope: &Envelope) -> AckOutcome {
        let Some(severity) = envelope.payload.get("severity").and_then(|v| v.as_f64()) else {
            warn!("s3: algedonic signal missing severity");
            return AckOutcome::Ack;
        };
        let kind = envelope
            .payload
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or("pain");
        if kind != SignalKind::Pain.as_str() {
            return AckOutcome::Ack;
        }

        let state = self.state_machine.record_pain(severity);
        if state == GlobalState::Critical {
            let id = match self
                .interventions
                .start(envelope.tenant_id, InterventionKind::ThrottleInput, "s3 state reached critical")
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "s3: failed to record intervention start");
                    return AckOutcome::Nack;
                }
            };
            self.state_machine.begin_intervention();
            if let Err(e) = self.interventions.end(id, "throttled").await {
                warn!(error = %e, "s3: failed to record intervention end");
            }
            self.state_machine.end_intervention();
        }
        AckOutcome::Ack
    }

    async fn handle_sync(&self, envelope: &Envelope) -> AckOutcome {
        let weight = envelope.payload.get("weight").and_then(|v| v.as_f64()).unwrap_or(1.0);
        if weight < ANALYSIS_WEIGHT_THRESHOLD {
            return AckOutcome::Ack;
        }

        let payload = serde_json::json!({
            "kind": "root_cause",
            "title": envelope.payload.get("workflow_id").cloned().unwrap_or(serde_json::Value::Null),
            "payload": envelope.payload,
        });
        let next = Envelope::new("vsm.s4.analyze", payload, envelope.tenant_id)
            .with_correlation_id(envelope.correlation_id);
        match self.bus.publish("cyb", "vsm.s4.analyze", next).await {
            Ok(()) => AckOutcome::Ack,
            Err(e) => {
                warn!(error = %e, "s3: failed to forward analysis request to s4");
                AckOutcome::Nack
            }
        }
    }

    fn handle_policy_update(&self, envelope: &Envelope) -> AckOutcome {
        let name = envelope
            .payload
            .get("policy_name")
            .and_then(|v| v.as_str())
            .unwrap_or("default");
        let document = envelope.payload.get("document").cloned().unwrap_or(serde_json::Value::Null);
        self.policy_cache.push(name, document);
        AckOutcome::Ack
    }
}

#[async_trait]
impl Handler for S3Handler {
    async fn handle(&self, envelope: Envelope) -> AckOutcome {
        match envelope.message_type.as_str() {
            "vsm.s3.algedonic" => self.handle_algedonic(&envelope).await,
            "vsm.s3.sync" => self.handle_sync(&envelope).await,
            "vsm.s3.policy_update" => self.handle_policy_update(&envelope),
            "vsm.s3.status_request" => AckOutcome::Ack,
            other => {
                warn!(message_type = %other, "s3: no handler for routing key");
                AckOutcome::Ack
            }
        }
    }
}
