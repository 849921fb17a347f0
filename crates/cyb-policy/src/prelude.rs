//! Convenience re-exports for downstream crates.

pub use crate::analyst::GovernanceAnalyst;
pub use crate::decider::LlmGovernedDecider;
pub use crate::error::{PolicyError, PolicyResult};
pub use crate::evolution::{MetaPolicyStore, ProposalRecord};
pub use crate::proposal::{PolicyProposal, ProposalOutcome};
