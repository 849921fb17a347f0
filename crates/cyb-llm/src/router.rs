//! The fallback routing loop (spec §4.10): try each provider in the
//! episode's chain, falling back on transient failure with exponential
//! backoff and jitter, aborting on a permanent one, and reporting
//! `all_providers_failed` once the chain is exhausted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cyb_breaker::CircuitBreaker;
use cyb_cache::DeterministicCache;
use cyb_core::EpisodeId;
use cyb_crypto::ContentHash;
use cyb_ratelimit::{RateLimiter, S4_LLM_BUDGET};
use cyb_telemetry::{TelemetryBus, TelemetryEvent};
use dashmap::DashMap;

use crate::chain::chain_for_kind;
use crate::episode::Episode;
use crate::error::{LlmError, LlmResult};
use crate::fingerprint::fingerprint;
use crate::memory::{Memory, MemoryRole};
use crate::provider::{AnalyzeOpts, CACHE_PROVIDER_NAME, Provider, ProviderId, ProviderOutput};

/// Tuning for the router's fallback and caching behavior.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub cache_ttl: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            cache_ttl: Some(Duration::from_secs(3600)),
        }
    }
}

/// The exponential-backoff-with-jitter delay before retrying the next
/// provider in the chain: `min(2^attempts * base, max) + rand() * 0.5 *
/// that delay`.
#[must_use]
pub fn backoff_duration(attempts: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponential = 2u64.saturating_pow(attempts).saturating_mul(base_ms);
    let delay = exponential.min(max_ms);
    let jitter = (rand::random::<f64>() * 0.5 * delay as f64) as u64;
    Duration::from_millis(delay + jitter)
}

/// Which provider ultimately answered an episode, and how many were
/// contacted before it did.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub provider: String,
    pub attempts: u32,
}

/// Owns the registered providers and the shared infrastructure
/// (ratelimiter, breaker, cache, telemetry, memory) the routing loop
/// consults on every call.
pub struct Router {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    ratelimiter: Arc<RateLimiter>,
    breaker: Arc<CircuitBreaker>,
    cache: Option<Arc<DeterministicCache>>,
    cache_index: DashMap<String, ContentHash>,
    telemetry: Arc<TelemetryBus>,
    memory: Arc<dyn Memory>,
    config: RouterConfig,
}

impl Router {
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        ratelimiter: Arc<RateLimiter>,
        breaker: Arc<CircuitBreaker>,
        cache: Option<Arc<DeterministicCache>>,
        telemetry: Arc<TelemetryBus>,
        memory: Arc<dyn Memory>,
        config: RouterConfig,
    ) -> Self {
        ratelimiter.declare_budget(S4_LLM_BUDGET, cyb_ratelimit::BudgetSpec::new(60, 60_000));
        Self {
            providers: providers.into_iter().map(|p| (p.id(), p)).collect(),
            ratelimiter,
            breaker,
            cache,
            cache_index: DashMap::new(),
            telemetry,
            memory,
            config,
        }
    }

    fn model_policy_id(opts: &AnalyzeOpts) -> String {
        opts.model.clone().unwrap_or_else(|| "default".to_string())
    }

    fn cache_lookup(&self, episode: &Episode, opts: &AnalyzeOpts) -> Option<ProviderOutput> {
        let cache = self.cache.as_ref()?;
        let fp = fingerprint(episode.kind, &opts.prompt, &Self::model_policy_id(opts));
        let key = *self.cache_index.get(&fp)?;
        if !cache.probably_exists(&key) {
            return None;
        }
        let bytes = cache.get(&key).ok()?;
        let output: ProviderOutput = serde_json::from_slice(&bytes).ok()?;
        self.telemetry.publish(
            &TelemetryEvent::new("cyb.s4.cache_hit", "s4")
                .with_metadata("episode_kind", episode.kind.as_str()),
        );
        Some(output)
    }

    fn cache_store(&self, episode: &Episode, opts: &AnalyzeOpts, output: &ProviderOutput) {
        let Some(cache) = &self.cache else { return };
        let Ok(bytes) = serde_json::to_vec(output) else { return };
        let fp = fingerprint(episode.kind, &opts.prompt, &Self::model_policy_id(opts));
        let key = cache.put(&bytes, self.config.cache_ttl, "application/json");
        self.cache_index.insert(fp, key);
    }

    fn effective_prompt(&self, episode: &Episode, opts: &AnalyzeOpts) -> String {
        let context = self.memory.context(episode.id);
        if context.is_empty() {
            return opts.prompt.clone();
        }
        let mut joined = String::new();
        for turn in &context {
            let role = match turn.role {
                MemoryRole::User => "user",
                MemoryRole::Assistant => "assistant",
            };
            joined.push_str(role);
            joined.push_str(": ");
            joined.push_str(&turn.content);
            joined.push('\n');
        }
        joined.push_str(&opts.prompt);
        joined
    }

    fn emit_fallback(&self, provider: &str, reason: &str, attempt: u32) {
        self.telemetry.publish(
            &TelemetryEvent::new("cyb.s4.fallback", "s4")
                .with_metadata("provider", provider)
                .with_metadata("reason", reason)
                .with_measurement("attempt", f64::from(attempt + 1)),
        );
    }

    async fn sleep_backoff(&self, attempts: u32) {
        let delay = backoff_duration(attempts, self.config.base_backoff_ms, self.config.max_backoff_ms);
        tokio::time::sleep(delay).await;
    }

    /// Route `episode` through its chain (or `opts.override_chain`),
    /// consulting the deterministic cache first if enabled, and falling
    /// back across providers on transient failure.
    ///
    /// # Errors
    ///
    /// Returns the first permanent [`LlmError`] encountered, or
    /// [`LlmError::AllProvidersFailed`] once every provider in the chain
    /// has been tried and failed transiently.
    pub async fn analyze(&self, episode: &Episode, opts: AnalyzeOpts) -> LlmResult<(ProviderOutput, RouteMeta)> {
        if opts.use_cache {
            if let Some(output) = self.cache_lookup(episode, &opts) {
                return Ok((
                    output,
                    RouteMeta {
                        provider: CACHE_PROVIDER_NAME.to_string(),
                        attempts: 0,
                    },
                ));
            }
        }

        let chain = opts
            .override_chain
            .clone()
            .unwrap_or_else(|| chain_for_kind(episode.kind));

        let mut call_opts = opts.clone();
        call_opts.prompt = self.effective_prompt(episode, &opts);

        let mut attempts: u32 = 0;
        for provider_id in &chain {
            let subject = provider_id.as_str();

            let Some(provider) = self.providers.get(provider_id) else {
                continue;
            };

            if self.breaker.allow(subject).is_err() {
                continue;
            }

            if self.ratelimiter.request_tokens(S4_LLM_BUDGET, subject, episode.priority).is_err() {
                self.emit_fallback(subject, "rate_limited", attempts);
                self.sleep_backoff(attempts).await;
                attempts += 1;
                continue;
            }

            match provider.analyze_episode(episode, &call_opts).await {
                Ok(output) => {
                    self.breaker.record_success(subject);
                    self.memory.record(episode.id, MemoryRole::User, opts.prompt.clone());
                    self.memory.record(episode.id, MemoryRole::Assistant, output.text.clone());
                    if opts.use_cache {
                        self.cache_store(episode, &opts, &output);
                    }
                    let meta = RouteMeta {
                        provider: subject.to_string(),
                        attempts: attempts + 1,
                    };
                    self.telemetry.publish(
                        &TelemetryEvent::new("cyb.s4.success", "s4")
                            .with_metadata("provider", subject)
                            .with_measurement("attempts", f64::from(meta.attempts)),
                    );
                    return Ok((output, meta));
                }
                Err(e) if e.is_transient() => {
                    self.breaker.record_failure(subject);
                    self.emit_fallback(subject, &e.kind().to_string(), attempts);
                    self.sleep_backoff(attempts).await;
                    attempts += 1;
                }
                Err(e) => {
                    self.breaker.record_failure(subject);
                    return Err(e);
                }
            }
        }

        self.telemetry.publish(
            &TelemetryEvent::new("cyb.s4.all_providers_failed", "s4")
                .with_metadata("episode_kind", episode.kind.as_str())
                .with_measurement("attempts", f64::from(attempts)),
        );
        Err(LlmError::AllProvidersFailed)
    }

    /// The memory backing this router, for admin inspection (e.g. the CLI
    /// dumping an episode's transcript).
    #[must_use]
    pub fn episode_context(&self, episode: EpisodeId) -> Vec<crate::memory::MemoryItem> {
        self.memory.context(episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::EpisodeKind;
    use crate::memory::InMemoryEpisodeMemory;
    use async_trait::async_trait;
    use cyb_core::{Priority, TenantId};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedProvider {
        id: ProviderId,
        calls: AtomicU32,
        outcomes: Vec<LlmResult<ProviderOutput>>,
    }

    impl ScriptedProvider {
        fn new(id: ProviderId, outcomes: Vec<LlmResult<ProviderOutput>>) -> Arc<Self> {
            Arc::new(Self {
                id,
                calls: AtomicU32::new(0),
                outcomes,
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn analyze_episode(&self, _episode: &Episode, _opts: &AnalyzeOpts) -> LlmResult<ProviderOutput> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.outcomes[n.min(self.outcomes.len() - 1)].clone()
        }
    }

    fn ok_output(text: &str) -> ProviderOutput {
        ProviderOutput {
            text: text.to_string(),
            usage: Default::default(),
            citations: Vec::new(),
            confidence: Some(0.9),
        }
    }

    fn router(providers: Vec<Arc<dyn Provider>>) -> Router {
        let telemetry = Arc::new(TelemetryBus::new());
        Router::new(
            providers,
            Arc::new(RateLimiter::new(Arc::clone(&telemetry))),
            Arc::new(CircuitBreaker::new(Arc::clone(&telemetry))),
            None,
            telemetry,
            Arc::new(InMemoryEpisodeMemory::default()),
            RouterConfig {
                base_backoff_ms: 1,
                max_backoff_ms: 5,
                cache_ttl: None,
            },
        )
    }

    fn episode(kind: EpisodeKind) -> Episode {
        Episode::new(TenantId::new(), kind, "t", Value::Null).with_priority(Priority::Normal)
    }

    #[tokio::test]
    async fn falls_back_from_rate_limited_openai_to_together() {
        let openai = ScriptedProvider::new(ProviderId::OpenAi, vec![Err(LlmError::RateLimited)]);
        let together = ScriptedProvider::new(ProviderId::Together, vec![Ok(ok_output("root cause found"))]);
        let anthropic = ScriptedProvider::new(ProviderId::Anthropic, vec![Ok(ok_output("unused"))]);

        let r = router(vec![openai, together, anthropic]);
        let (output, meta) = r
            .analyze(&episode(EpisodeKind::CodeGen), AnalyzeOpts::new("why?").with_use_cache(false))
            .await
            .unwrap();

        assert_eq!(meta.provider, "together");
        assert_eq!(meta.attempts, 2);
        assert_eq!(output.text, "root cause found");
    }

    #[tokio::test]
    async fn permanent_error_aborts_without_trying_the_rest_of_the_chain() {
        let anthropic = ScriptedProvider::new(
            ProviderId::Anthropic,
            vec![Err(LlmError::RequestFailed("bad request".to_string()))],
        );
        let together = ScriptedProvider::new(ProviderId::Together, vec![Ok(ok_output("unused"))]);

        let r = router(vec![anthropic, together]);
        let result = r
            .analyze(
                &episode(EpisodeKind::PolicyReview),
                AnalyzeOpts::new("review this").with_use_cache(false),
            )
            .await;

        assert_eq!(result.unwrap_err(), LlmError::RequestFailed("bad request".to_string()));
    }

    #[tokio::test]
    async fn exhausting_the_chain_reports_all_providers_failed() {
        let a = ScriptedProvider::new(ProviderId::Anthropic, vec![Err(LlmError::Timeout)]);
        let b = ScriptedProvider::new(ProviderId::Ollama, vec![Err(LlmError::Timeout)]);

        let r = router(vec![a, b]);
        let result = r
            .analyze(
                &episode(EpisodeKind::ComplianceCheck),
                AnalyzeOpts::new("check").with_use_cache(false),
            )
            .await;

        assert_eq!(result.unwrap_err(), LlmError::AllProvidersFailed);
    }

    #[tokio::test]
    async fn override_chain_replaces_the_kind_default() {
        let ollama = ScriptedProvider::new(ProviderId::Ollama, vec![Ok(ok_output("local answer"))]);
        let r = router(vec![ollama]);

        let (output, meta) = r
            .analyze(
                &episode(EpisodeKind::CodeGen),
                AnalyzeOpts::new("write it").with_use_cache(false).with_override_chain(vec![ProviderId::Ollama]),
            )
            .await
            .unwrap();

        assert_eq!(meta.provider, "ollama");
        assert_eq!(output.text, "local answer");
    }

    #[tokio::test]
    async fn second_call_with_same_fingerprint_hits_the_cache() {
        let telemetry = Arc::new(TelemetryBus::new());
        let openai = ScriptedProvider::new(ProviderId::OpenAi, vec![Ok(ok_output("fresh"))]);
        let cache = Arc::new(DeterministicCache::new(Default::default(), Arc::clone(&telemetry)));
        let r = Router::new(
            vec![openai],
            Arc::new(RateLimiter::new(Arc::clone(&telemetry))),
            Arc::new(CircuitBreaker::new(Arc::clone(&telemetry))),
            Some(cache),
            telemetry,
            Arc::new(InMemoryEpisodeMemory::default()),
            RouterConfig {
                base_backoff_ms: 1,
                max_backoff_ms: 5,
                cache_ttl: None,
            },
        );

        let ep = episode(EpisodeKind::Classification);
        let opts = AnalyzeOpts::new("classify this");
        let (first, first_meta) = r.analyze(&ep, opts.clone()).await.unwrap();
        let (second, second_meta) = r.analyze(&ep, opts).await.unwrap();

        assert_eq!(first_meta.provider, "openai");
        assert_eq!(second_meta.provider, "cache");
        assert_eq!(first.text, second.text);
    }
}
