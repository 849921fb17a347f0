//! Convenience re-exports for downstream crates.

pub use crate::compliance::ComplianceChecker;
pub use crate::coordination::{AttentionEntry, CoordinationState};
pub use crate::error::{VsmError, VsmResult};
pub use crate::intervention::{InterventionKind, InterventionLog};
pub use crate::policy_cache::{PolicyCache, PolicyRecord};
pub use crate::s1::S1Handler;
pub use crate::s2::S2Handler;
pub use crate::s3::S3Handler;
pub use crate::s4::S4Handler;
pub use crate::s5::{ConfidenceThresholdDecider, PolicyDecider, PolicyDecision, S5Handler};
pub use crate::signal::{AlgedonicSignal, SignalKind};
pub use crate::state::{GlobalState, S3Config, S3StateMachine};
pub use crate::tier::subscribe_tier;
