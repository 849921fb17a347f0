//! Governance and meta-policy evolution (C12): structured LLM analyses
//! of proposed policy changes, and the versioned decision history layered
//! over S3's live policy cache (spec §4.11, §4.12's S5 role).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod analyst;
pub mod decider;
pub mod error;
pub mod evolution;
pub mod prelude;
pub mod proposal;

pub use analyst::GovernanceAnalyst;
pub use decider::LlmGovernedDecider;
pub use error::{PolicyError, PolicyResult};
pub use evolution::{MetaPolicyStore, ProposalRecord};
pub use proposal::{PolicyProposal, ProposalOutcome};
