//! S1 Operations: the tier closest to the outside world. Receives routed
//! external events (from C14 via C1) and forwards a coordination request
//! to S2 (spec §4.11, §9 data flow).

use std::sync::Arc;

use async_trait::async_trait;
use cyb_audit::{AuditLog, EntryMetadata};
use cyb_bus::{AckOutcome, Envelope, Handler, InMemoryMessageBus};
use tracing::warn;

/// S1's handler: audits the inbound operation, then republishes it as a
/// coordination request on `vsm.s2.coordinate`.
pub struct S1Handler {
    bus: Arc<InMemoryMessageBus>,
    audit: Arc<AuditLog>,
}

impl S1Handler {
    #[must_use]
    pub fn new(bus: Arc<InMemoryMessageBus>, audit: Arc<AuditLog>) -> Self {
        Self { bus, audit }
    }
}

#[async_trait]
impl Handler for S1Handler {
    async fn handle(&self, envelope: Envelope) -> AckOutcome {
        let metadata = EntryMetadata {
            correlation_id: Some(envelope.correlation_id),
            ..EntryMetadata::default()
        };
        if let Err(e) = self.audit.append("s1_operation", "s1", envelope.payload.clone(), metadata).await {
            warn!(error = %e, "s1: failed to audit inbound operation");
            return AckOutcome::Nack;
        }

        let next = Envelope::new("vsm.s2.coordinate", envelope.payload.clone(), envelope.tenant_id)
            .with_correlation_id(envelope.correlation_id);
        match self.bus.publish("cyb", "vsm.s2.coordinate", next).await {
            Ok(()) => AckOutcome::Ack,
            Err(e) => {
                warn!(error = %e, "s1: failed to forward coordination request");
                AckOutcome::Nack
            }
        }
    }
}
