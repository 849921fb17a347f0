//! Interventions S3 enqueues once its state machine reaches `critical`
//! (spec §4.11): `restart_component`, `throttle_input`, `policy_update`.
//! Start and end are both recorded in the audit chain.

use std::sync::Arc;

use cyb_audit::{AuditLog, EntryMetadata};
use cyb_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VsmResult;

/// The action kinds S3 can take once it decides to intervene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    RestartComponent,
    ThrottleInput,
    PolicyUpdate,
}

impl InterventionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RestartComponent => "restart_component",
            Self::ThrottleInput => "throttle_input",
            Self::PolicyUpdate => "policy_update",
        }
    }
}

/// Records intervention start/end as paired audit entries, correlated by
/// `intervention_id`.
pub struct InterventionLog {
    audit: Arc<AuditLog>,
}

impl InterventionLog {
    #[must_use]
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self { audit }
    }

    /// Record the start of an intervention. Returns the correlation id
    /// that must be passed to [`Self::end`].
    ///
    /// # Errors
    ///
    /// Returns an error if the audit chain append fails.
    pub async fn start(&self, tenant_id: TenantId, kind: InterventionKind, reason: &str) -> VsmResult<Uuid> {
        let intervention_id = Uuid::new_v4();
        self.audit
            .append(
                "intervention_start",
                "s3",
                serde_json::json!({
                    "intervention_id": intervention_id,
                    "tenant_id": tenant_id,
                    "kind": kind.as_str(),
                    "reason": reason,
                }),
                EntryMetadata::default(),
            )
            .await?;
        Ok(intervention_id)
    }

    /// Record the conclusion of an intervention previously opened with
    /// [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the audit chain append fails.
    pub async fn end(&self, intervention_id: Uuid, outcome: &str) -> VsmResult<()> {
        self.audit
            .append(
                "intervention_end",
                "s3",
                serde_json::json!({
                    "intervention_id": intervention_id,
                    "outcome": outcome,
                }),
                EntryMetadata::default(),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_crypto::ChainSigner;
    use cyb_telemetry::TelemetryBus;

    #[tokio::test]
    async fn start_then_end_appends_paired_entries() {
        let signer = ChainSigner::new([7u8; 32]);
        let audit = Arc::new(AuditLog::open(
            Arc::new(cyb_storage::MemoryKvStore::new()),
            signer,
            Arc::new(TelemetryBus::new()),
            "test-node",
        ).await.unwrap());
        let log = InterventionLog::new(Arc::clone(&audit));

        let id = log
            .start(TenantId::new(), InterventionKind::ThrottleInput, "s3 critical")
            .await
            .unwrap();
        log.end(id, "resolved").await.unwrap();

        let verification = audit.verify_integrity(None, None).await.unwrap();
        assert!(matches!(
            verification,
            cyb_audit::ChainVerification::Ok { chain_intact: true, .. }
        ));
    }
}
