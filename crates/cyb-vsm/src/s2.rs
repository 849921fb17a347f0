//! S2 Coordination: tracks per-workflow attention weights and publishes
//! its decisions on to S3 (spec §4.11).

use std::sync::Arc;

use async_trait::async_trait;
use cyb_bus::{AckOutcome, Envelope, Handler, InMemoryMessageBus};
use tracing::warn;

use crate::coordination::CoordinationState;

/// S2's handler: focuses the workflow named in the inbound payload and
/// forwards the resulting attention weight to S3.
pub struct S2Handler {
    bus: Arc<InMemoryMessageBus>,
    coordination: Arc<CoordinationState>,
}

impl S2Handler {
    #[must_use]
    pub fn new(bus: Arc<InMemoryMessageBus>, coordination: Arc<CoordinationState>) -> Self {
        Self { bus, coordination }
    }
}

fn workflow_id(envelope: &Envelope) -> String {
    envelope
        .payload
        .get("workflow_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| envelope.correlation_id.to_string())
}

#[async_trait]
impl Handler for S2Handler {
    async fn handle(&self, envelope: Envelope) -> AckOutcome {
        let workflow_id = workflow_id(&envelope);
        let entry = self.coordination.focus(&workflow_id);

        let payload = serde_json::json!({
            "workflow_id": workflow_id,
            "weight": entry.weight,
        });
        let next = Envelope::new("vsm.s3.sync", payload, envelope.tenant_id)
            .with_correlation_id(envelope.correlation_id);

        match self.bus.publish("cyb", "vsm.s3.sync", next).await {
            Ok(()) => AckOutcome::Ack,
            Err(e) => {
                warn!(error = %e, "s2: failed to publish coordination decision");
                AckOutcome::Nack
            }
        }
    }
}
