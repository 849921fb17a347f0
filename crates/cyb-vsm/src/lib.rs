//! The five-tier cybernetic control hierarchy (C11, spec §4.11): S1
//! Operations, S2 Coordination, S3 Control (global state machine,
//! interventions, policy cache, compliance checker), S4 Intelligence (the
//! LLM router), and S5 Policy. Each tier is a [`cyb_bus::Handler`]
//! subscribed to its own `vsm.s<n>.*` queue; algedonic signals bypass the
//! hierarchy and reach S3 directly.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod compliance;
pub mod coordination;
pub mod error;
pub mod intervention;
pub mod policy_cache;
pub mod prelude;
pub mod s1;
pub mod s2;
pub mod s3;
pub mod s4;
pub mod s5;
pub mod signal;
pub mod state;
pub mod tier;

pub use compliance::ComplianceChecker;
pub use coordination::{AttentionEntry, CoordinationState};
pub use error::{VsmError, VsmResult};
pub use intervention::{InterventionKind, InterventionLog};
pub use policy_cache::{PolicyCache, PolicyRecord};
pub use s1::S1Handler;
pub use s2::S2Handler;
pub use s3::S3Handler;
pub use s4::S4Handler;
pub use s5::{ConfidenceThresholdDecider, PolicyDecider, PolicyDecision, S5Handler};
pub use signal::{AlgedonicSignal, SignalKind};
pub use state::{GlobalState, S3Config, S3StateMachine};
pub use tier::subscribe_tier;
