//! The wire envelope every bus message carries (spec §6: `{type, payload,
//! correlation_id, nonce, ts, tenant_id}`).

use cyb_core::{TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A routed message on the bus. `nonce` paired with `tenant_id` is the
/// dedup key the broker uses to drop replays within its window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: serde_json::Value,
    pub correlation_id: Uuid,
    pub nonce: Uuid,
    pub ts: Timestamp,
    pub tenant_id: TenantId,
}

impl Envelope {
    /// Build a fresh envelope with a random nonce and the current
    /// timestamp, so callers only supply the parts that vary per message.
    #[must_use]
    pub fn new(message_type: impl Into<String>, payload: serde_json::Value, tenant_id: TenantId) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
            correlation_id: Uuid::new_v4(),
            nonce: Uuid::new_v4(),
            ts: Timestamp::now(),
            tenant_id,
        }
    }

    /// Carry an explicit correlation id through a chain of derived
    /// messages (e.g. S2's reply to an S1 request).
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// The `(tenant_id, nonce)` dedup key.
    #[must_use]
    pub fn dedup_key(&self) -> (TenantId, Uuid) {
        (self.tenant_id, self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_envelope_has_distinct_nonce_and_correlation_id() {
        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new());
        assert_ne!(env.nonce, env.correlation_id);
    }

    #[test]
    fn with_correlation_id_overrides_default() {
        let cid = Uuid::new_v4();
        let env = Envelope::new("vsm.s1.operation", serde_json::json!({}), TenantId::new())
            .with_correlation_id(cid);
        assert_eq!(env.correlation_id, cid);
    }
}
