//! LLM router (C10): chain selection, provider fallback with backoff and
//! jitter, budget/breaker coupling, deterministic-cache-backed memoization,
//! and bounded per-episode memory (spec §4.10).
//!
//! The router is vendor-agnostic: [`provider::Provider`] is the seam a
//! concrete adapter (OpenAI, Anthropic, Together, Ollama, or any other
//! backend) implements, and [`router::Router`] only ever sees the trait.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod chain;
pub mod episode;
pub mod error;
pub mod fingerprint;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod router;

pub use chain::chain_for_kind;
pub use episode::{Episode, EpisodeKind, Explanation};
pub use error::{LlmError, LlmResult};
pub use memory::{InMemoryEpisodeMemory, Memory, MemoryItem, MemoryRole};
pub use provider::{AnalyzeOpts, Provider, ProviderId, ProviderOutput, TokenUsage};
pub use router::{Router, RouterConfig, RouteMeta};
