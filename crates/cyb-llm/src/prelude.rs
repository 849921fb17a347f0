//! Convenience re-exports for downstream crates.

pub use crate::chain::chain_for_kind;
pub use crate::episode::{Episode, EpisodeKind, Explanation};
pub use crate::error::{LlmError, LlmResult};
pub use crate::memory::{InMemoryEpisodeMemory, Memory, MemoryItem, MemoryRole};
pub use crate::provider::{AnalyzeOpts, Provider, ProviderId, ProviderOutput, TokenUsage};
pub use crate::router::{RouteMeta, Router, RouterConfig};
