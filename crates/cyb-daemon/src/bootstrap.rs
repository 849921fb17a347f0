//! Startup sequencing (spec §6, §9): load configuration, open storage,
//! wire every service, subscribe the five VSM tiers to the bus, and hand
//! back everything the HTTP edge and the admin CLI need.

use std::sync::Arc;
use std::time::Duration;

use cyb_audit::AuditLog;
use cyb_auth::{AuthManager, JwtCodec};
use cyb_bus::{InMemoryMessageBus, QueuePolicy};
use cyb_cache::{CacheLimits, DeterministicCache};
use cyb_config::Settings;
use cyb_core::{CybernikResult, TenantId};
use cyb_crypto::{Argon2Params, ChainSigner, PasswordHasherService};
use cyb_llm::{InMemoryEpisodeMemory, Router, RouterConfig};
use cyb_ratelimit::{BudgetSpec, RateLimiter};
use cyb_storage::{KvStore, MemoryKvStore};
use cyb_telemetry::TelemetryBus;
use cyb_vsm::{
    ConfidenceThresholdDecider, CoordinationState, InterventionLog, PolicyCache, PolicyDecider,
    S1Handler, S2Handler, S3Config, S3Handler, S3StateMachine, S4Handler, S5Handler, subscribe_tier,
};

use crate::users::seed_users;

/// Env var naming the directory a durable `SurrealKV` store should be
/// opened at. Unset means the daemon runs against an in-memory store,
/// which is fine for a dev/test process but loses every session, audit
/// entry, and cached response on restart.
const DATA_DIR_VAR: &str = "CYBERNETIC_DATA_DIR";

/// Budget governing inbound Telegram webhook traffic, keyed per chat id.
pub const WEBHOOK_BUDGET: &str = "telegram_webhook";

/// The tenant every externally-sourced message (webhook, anonymous
/// `/v1/generate` caller with no tenant context of its own) is attributed
/// to. A single-tenant deployment never needs to declare more than this.
fn default_tenant() -> TenantId {
    TenantId::new()
}

/// Every long-lived service the daemon wires at startup, held together so
/// both `main.rs` and the admin CLI can build an [`cyb_http::AppState`] or
/// drive a service directly without re-running bootstrap.
pub struct Services {
    pub telemetry: Arc<TelemetryBus>,
    pub bus: Arc<InMemoryMessageBus>,
    pub storage: Arc<dyn KvStore>,
    pub auth: Arc<AuthManager>,
    pub password_hasher: PasswordHasherService,
    pub tenants: Arc<cyb_auth::TenantDirectory>,
    pub audit: Arc<AuditLog>,
    pub ratelimiter: Arc<RateLimiter>,
    pub breaker: Arc<cyb_breaker::CircuitBreaker>,
    pub cache: Arc<DeterministicCache>,
    pub router: Arc<Router>,
    pub policy_cache: Arc<PolicyCache>,
    pub interventions: Arc<InterventionLog>,
    pub state_machine: Arc<S3StateMachine>,
    pub coordination: Arc<CoordinationState>,
    pub sse: Arc<cyb_http::SseHub>,
    pub metrics: Arc<cyb_http::EdgeMetrics>,
    pub default_tenant: TenantId,
}

impl Services {
    /// Assemble the [`cyb_http::AppState`] the HTTP edge serves from.
    #[must_use]
    pub fn app_state(&self, webhook_secret: String) -> cyb_http::AppState {
        cyb_http::AppState {
            auth: Arc::clone(&self.auth),
            router: Arc::clone(&self.router),
            bus: Arc::clone(&self.bus),
            telemetry: Arc::clone(&self.telemetry),
            ratelimiter: Arc::clone(&self.ratelimiter),
            audit: Arc::clone(&self.audit),
            cache: Some(Arc::clone(&self.cache)),
            sse: Arc::clone(&self.sse),
            metrics: Arc::clone(&self.metrics),
            config: Arc::new(cyb_http::EdgeConfig {
                default_tenant: self.default_tenant,
                telegram_webhook_secret: webhook_secret,
                webhook_budget: WEBHOOK_BUDGET.to_string(),
            }),
        }
    }
}

/// Derive the API-key HMAC signing key from the session JWT secret.
/// Spec §6 names one signing key for the audit chain and one JWT secret
/// for sessions, but doesn't carry a third variable for API-key hashing;
/// rather than invent another required env var, this hashes the JWT
/// secret down to 32 bytes with SHA-256. A deployment that wants the two
/// keys independent can still set `JWT_SECRET` and `AUDIT_SIGNING_KEY` to
/// unrelated values — only the API-key signer is derived.
fn api_key_signing_key(jwt_secret: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(jwt_secret.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

async fn open_storage() -> CybernikResult<Arc<dyn KvStore>> {
    match std::env::var(DATA_DIR_VAR) {
        Ok(dir) => {
            let store = cyb_storage::SurrealKvStore::open(&dir)
                .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::StorageError, e.to_string()))?;
            Ok(Arc::new(store))
        }
        Err(_) => Ok(Arc::new(MemoryKvStore::new())),
    }
}

/// Run the full startup sequence.
///
/// # Errors
///
/// Returns an error if storage cannot be opened, the audit chain cannot
/// be opened or seeded, or a declared bootstrap user names an
/// unrecognized role.
pub async fn bootstrap(settings: Settings) -> CybernikResult<Services> {
    let telemetry = Arc::new(TelemetryBus::new());
    let storage = open_storage().await?;
    let bus = Arc::new(InMemoryMessageBus::new(Arc::clone(&telemetry)));

    let password_hasher = PasswordHasherService::new(settings.password_salt.into_bytes(), Argon2Params::default());
    let jwt_codec = JwtCodec::new(settings.jwt_secret.clone().into_bytes(), None);
    let api_key_signer = ChainSigner::new(api_key_signing_key(&settings.jwt_secret));
    let auth = Arc::new(AuthManager::new(
        Arc::clone(&storage),
        password_hasher.clone(),
        jwt_codec,
        api_key_signer,
        Arc::clone(&telemetry),
    ));
    auth.spawn_sweeper(Duration::from_secs(60));

    let tenants = Arc::new(cyb_auth::TenantDirectory::new(Arc::clone(&storage)));
    let default_tenant = default_tenant();

    let audit_signer = ChainSigner::new(settings.audit_signing_key);
    let audit = AuditLog::open(Arc::clone(&storage), audit_signer, Arc::clone(&telemetry), "cyb-daemon")
        .await
        .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::StorageError, e.to_string()))?;
    let audit = Arc::new(audit);

    seed_users(&auth, &password_hasher, &settings.users, default_tenant).await?;

    let ratelimiter = Arc::new(RateLimiter::new(Arc::clone(&telemetry)));
    ratelimiter.declare_budget(WEBHOOK_BUDGET, BudgetSpec::new(20, 60_000));

    let breaker = Arc::new(cyb_breaker::CircuitBreaker::new(Arc::clone(&telemetry)));

    let cache = Arc::new(DeterministicCache::new(CacheLimits::default(), Arc::clone(&telemetry)));
    cache.spawn_sweeper(Duration::from_secs(300));

    // No concrete `Provider` adapters ship in this workspace (vendor LLM
    // protocols are a pluggable seam the router exposes but never
    // implements); the router runs with an empty chain, so `/v1/generate`
    // and S4 both report `all_providers_failed` until a deployment
    // registers real adapters.
    let router = Arc::new(Router::new(
        Vec::new(),
        Arc::clone(&ratelimiter),
        Arc::clone(&breaker),
        Some(Arc::clone(&cache)),
        Arc::clone(&telemetry),
        Arc::new(InMemoryEpisodeMemory::default()),
        RouterConfig::default(),
    ));

    let policy_cache = Arc::new(PolicyCache::new());
    let interventions = Arc::new(InterventionLog::new(Arc::clone(&audit)));
    let state_machine = Arc::new(S3StateMachine::new(S3Config::default(), Arc::clone(&telemetry)));
    let coordination = Arc::new(CoordinationState::new());

    subscribe_tier(
        &bus,
        1,
        "s1",
        Arc::new(S1Handler::new(Arc::clone(&bus), Arc::clone(&audit))),
        QueuePolicy::default(),
    )
    .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::ServerError, e.to_string()))?;

    subscribe_tier(
        &bus,
        2,
        "s2",
        Arc::new(S2Handler::new(Arc::clone(&bus), Arc::clone(&coordination))),
        QueuePolicy::default(),
    )
    .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::ServerError, e.to_string()))?;

    subscribe_tier(
        &bus,
        3,
        "s3",
        Arc::new(S3Handler::new(
            Arc::clone(&bus),
            Arc::clone(&state_machine),
            Arc::clone(&interventions),
            Arc::clone(&policy_cache),
        )),
        QueuePolicy::default(),
    )
    .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::ServerError, e.to_string()))?;

    subscribe_tier(
        &bus,
        4,
        "s4",
        Arc::new(S4Handler::new(Arc::clone(&bus), Arc::clone(&router))),
        QueuePolicy::default(),
    )
    .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::ServerError, e.to_string()))?;

    let decider: Arc<dyn PolicyDecider> = Arc::new(ConfidenceThresholdDecider::default());
    subscribe_tier(
        &bus,
        5,
        "s5",
        Arc::new(S5Handler::new(Arc::clone(&bus), decider)),
        QueuePolicy::default(),
    )
    .map_err(|e| cyb_core::CybernikError::new(cyb_core::ErrorKind::ServerError, e.to_string()))?;

    let sse = Arc::new(cyb_http::SseHub::new());
    sse.bridge_telemetry(&telemetry);
    sse.spawn_heartbeat();

    let metrics = Arc::new(cyb_http::EdgeMetrics::new());

    Ok(Services {
        telemetry,
        bus,
        storage,
        auth,
        password_hasher,
        tenants,
        audit,
        ratelimiter,
        breaker,
        cache,
        router,
        policy_cache,
        interventions,
        state_machine,
        coordination,
        sse,
        metrics,
        default_tenant,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use base64::Engine;

    use super::*;

    fn settings() -> Settings {
        let mut vars = BTreeMap::new();
        vars.insert("JWT_SECRET".to_string(), "a".repeat(32));
        vars.insert("PASSWORD_SALT".to_string(), "pepper".to_string());
        vars.insert(
            "AUDIT_SIGNING_KEY".to_string(),
            base64::engine::general_purpose::STANDARD.encode([7u8; 32]),
        );
        vars.insert("CYBERNETIC_USER_ADMIN".to_string(), "hunter2:admin".to_string());
        Settings::load_from(&vars).unwrap()
    }

    #[tokio::test]
    async fn wires_every_service_and_seeds_bootstrap_users() {
        let services = bootstrap(settings()).await.unwrap();
        let users = services.auth.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "ADMIN");
    }

    #[tokio::test]
    async fn seeded_user_can_authenticate() {
        let services = bootstrap(settings()).await.unwrap();
        let tokens = services.auth.authenticate("ADMIN", "hunter2", None).await.unwrap();
        assert!(!tokens.token.is_empty());
    }

    #[tokio::test]
    async fn webhook_budget_is_declared() {
        let services = bootstrap(settings()).await.unwrap();
        assert_eq!(services.ratelimiter.consumed(WEBHOOK_BUDGET, "chat-1", cyb_core::Priority::Normal), 0);
    }

    #[test]
    fn api_key_signing_key_is_deterministic_and_distinct_from_jwt_secret() {
        let secret = "a".repeat(32);
        let key_a = api_key_signing_key(&secret);
        let key_b = api_key_signing_key(&secret);
        assert_eq!(key_a, key_b);
        assert_ne!(key_a.to_vec(), secret.into_bytes());
    }
}
