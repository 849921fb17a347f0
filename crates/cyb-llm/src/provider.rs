//! The vendor-agnostic provider seam (spec §4.10). Concrete vendor
//! protocols (OpenAI, Anthropic, Together, Ollama wire formats) are
//! pluggable adapters out of scope here; this trait is what the router
//! drives and what an adapter crate implements.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::episode::Episode;
use crate::error::LlmResult;

/// The providers named in the chain-selection table (spec §4.10). An
/// adapter implementing [`Provider`] is registered against one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Together,
    Ollama,
}

impl ProviderId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Together => "together",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The name the router's fallback loop reports for a cache hit, since it
/// never reaches a real provider (spec §4.10: "surfaced as a virtual
/// `cache` provider").
pub const CACHE_PROVIDER_NAME: &str = "cache";

/// Per-call tuning passed through to the active provider and used to build
/// the cache fingerprint (`fingerprint::fingerprint`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeOpts {
    pub prompt: String,
    #[serde(default)]
    pub params: Value,
    pub model: Option<String>,
    #[serde(default)]
    pub override_chain: Option<Vec<ProviderId>>,
    #[serde(default)]
    pub use_cache: bool,
}

impl AnalyzeOpts {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: Value::Null,
            model: None,
            override_chain: None,
            use_cache: true,
        }
    }

    #[must_use]
    pub fn with_override_chain(mut self, chain: Vec<ProviderId>) -> Self {
        self.override_chain = Some(chain);
        self
    }

    #[must_use]
    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

/// A single call's token accounting, surfaced for budget telemetry and
/// the audit chain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// What a provider call returns on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub text: String,
    pub usage: TokenUsage,
    #[serde(default)]
    pub citations: Vec<String>,
    pub confidence: Option<f64>,
}

/// A pluggable vendor adapter. Implementations own their own HTTP client
/// and wire protocol; the router only ever sees [`ProviderOutput`] or a
/// classified [`crate::error::LlmError`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identity used as the rate limiter/breaker subject and in
    /// telemetry metadata.
    fn id(&self) -> ProviderId;

    /// Run one episode through this provider.
    ///
    /// # Errors
    ///
    /// Returns a classified [`crate::error::LlmError`]; the router decides
    /// whether the kind is transient (fall back to the next provider in
    /// the chain) or permanent (abort).
    async fn analyze_episode(&self, episode: &Episode, opts: &AnalyzeOpts) -> LlmResult<ProviderOutput>;
}
