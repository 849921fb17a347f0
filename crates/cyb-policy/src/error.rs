//! Error type for governance analysis and meta-policy evolution.

use thiserror::Error;

/// Failures raised while reviewing a proposal or evolving the policy
/// store.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("llm error: {0}")]
    Llm(#[from] cyb_llm::LlmError),
    #[error("vsm error: {0}")]
    Vsm(#[from] cyb_vsm::VsmError),
    #[error("unknown proposal: {0}")]
    UnknownProposal(uuid::Uuid),
}

/// Result alias for governance operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
