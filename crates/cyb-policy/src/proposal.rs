//! A candidate policy change submitted for governance review (spec §4.12,
//! C12 "meta-policy evolution").

use cyb_core::TenantId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A policy change awaiting review. `document` is the full replacement
/// document for `name`, not a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProposal {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub document: Value,
    pub rationale: String,
}

impl PolicyProposal {
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>, document: Value, rationale: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            document,
            rationale: rationale.into(),
        }
    }
}

/// What governance decided about a reviewed proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProposalOutcome {
    Accepted { version: u64 },
    Rejected { reason: String },
}
