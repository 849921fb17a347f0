//! The unit of work the router fans out to providers (spec §3, §4.10).

use std::collections::HashMap;

use cyb_core::{EpisodeId, Priority, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The analytical task an episode asks a provider to perform. Drives chain
/// selection (`chain::chain_for_kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeKind {
    PolicyReview,
    CodeGen,
    RootCause,
    AnomalyDetection,
    ComplianceCheck,
    Optimization,
    Prediction,
    Classification,
}

impl EpisodeKind {
    /// The lowercase, underscore-separated name used in fingerprints and
    /// telemetry metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PolicyReview => "policy_review",
            Self::CodeGen => "code_gen",
            Self::RootCause => "root_cause",
            Self::AnomalyDetection => "anomaly_detection",
            Self::ComplianceCheck => "compliance_check",
            Self::Optimization => "optimization",
            Self::Prediction => "prediction",
            Self::Classification => "classification",
        }
    }
}

/// One unit of analysis submitted to the router by S4 (or by S3/S5 via the
/// bus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub tenant_id: TenantId,
    pub kind: EpisodeKind,
    pub title: String,
    pub payload: Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Episode {
    #[must_use]
    pub fn new(tenant_id: TenantId, kind: EpisodeKind, title: impl Into<String>, payload: Value) -> Self {
        Self {
            id: EpisodeId::new(),
            tenant_id,
            kind,
            title: title.into(),
            payload,
            priority: Priority::default(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// The structured result a provider hands back for an episode, the form
/// S4 cascades to S5 and the audit chain records (spec §4.10, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub episode_id: EpisodeId,
    pub summary: String,
    pub root_cause: Option<String>,
    pub impact: Option<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub sop_references: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_kind_names_are_snake_case() {
        assert_eq!(EpisodeKind::PolicyReview.as_str(), "policy_review");
        assert_eq!(EpisodeKind::AnomalyDetection.as_str(), "anomaly_detection");
    }

    #[test]
    fn new_episode_defaults_to_normal_priority() {
        let e = Episode::new(TenantId::new(), EpisodeKind::CodeGen, "t", Value::Null);
        assert_eq!(e.priority, Priority::Normal);
    }
}
