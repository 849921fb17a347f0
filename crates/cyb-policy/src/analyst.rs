//! Structured governance analyses: routes a proposal through the LLM
//! router under the `policy_review`/`compliance_check` episode kinds and
//! turns the provider's answer into an [`Explanation`].

use std::sync::Arc;

use cyb_llm::{AnalyzeOpts, Episode, EpisodeKind, Explanation, Router};

use crate::error::PolicyResult;
use crate::proposal::PolicyProposal;

/// Wraps the shared [`Router`] with the prompt shape governance analyses
/// use.
pub struct GovernanceAnalyst {
    router: Arc<Router>,
}

impl GovernanceAnalyst {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    async fn review_as(&self, proposal: &PolicyProposal, kind: EpisodeKind) -> PolicyResult<Explanation> {
        let episode = Episode::new(
            proposal.tenant_id,
            kind,
            proposal.name.clone(),
            serde_json::json!({
                "document": proposal.document,
                "rationale": proposal.rationale,
            }),
        );
        let prompt = format!(
            "Policy \"{}\" proposed change. Rationale: {}",
            proposal.name, proposal.rationale
        );
        let (output, _meta) = self.router.analyze(&episode, AnalyzeOpts::new(prompt)).await?;
        Ok(Explanation {
            episode_id: episode.id,
            summary: output.text,
            root_cause: None,
            impact: None,
            recommended_actions: Vec::new(),
            confidence: output.confidence.unwrap_or(0.5),
            sop_references: Vec::new(),
        })
    }

    /// Free-form policy review: does this change make sense given its
    /// rationale?
    ///
    /// # Errors
    ///
    /// Returns an error if every provider in the `policy_review` chain
    /// fails.
    pub async fn policy_review(&self, proposal: &PolicyProposal) -> PolicyResult<Explanation> {
        self.review_as(proposal, EpisodeKind::PolicyReview).await
    }

    /// Targeted compliance review: does this change violate a declared
    /// constraint?
    ///
    /// # Errors
    ///
    /// Returns an error if every provider in the `compliance_check` chain
    /// fails.
    pub async fn compliance_check(&self, proposal: &PolicyProposal) -> PolicyResult<Explanation> {
        self.review_as(proposal, EpisodeKind::ComplianceCheck).await
    }
}
