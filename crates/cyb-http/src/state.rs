//! Shared application state, cloned cheaply (every field is an `Arc`) into
//! every axum handler (spec §4.14; pattern grounded on `qc-16-api-gateway`'s
//! `AppState`).

use std::sync::Arc;

use cyb_audit::AuditLog;
use cyb_auth::AuthManager;
use cyb_bus::InMemoryMessageBus;
use cyb_cache::DeterministicCache;
use cyb_core::TenantId;
use cyb_llm::Router;
use cyb_ratelimit::RateLimiter;
use cyb_telemetry::TelemetryBus;

use crate::metrics::EdgeMetrics;
use crate::sse::SseHub;

/// Configuration the edge needs beyond the services it wires together.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Default tenant an unauthenticated inbound webhook is attributed to.
    pub default_tenant: TenantId,
    /// Shared secret the Telegram webhook's HMAC signature is checked
    /// against.
    pub telegram_webhook_secret: String,
    /// Rate limiter budget name declared for per-chat webhook throttling.
    pub webhook_budget: String,
}

/// Everything a handler needs, grouped behind `Arc` so cloning this struct
/// per-request is just a handful of atomic increments.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub router: Arc<Router>,
    pub bus: Arc<InMemoryMessageBus>,
    pub telemetry: Arc<TelemetryBus>,
    pub ratelimiter: Arc<RateLimiter>,
    pub audit: Arc<AuditLog>,
    pub cache: Option<Arc<DeterministicCache>>,
    pub sse: Arc<SseHub>,
    pub metrics: Arc<EdgeMetrics>,
    pub config: Arc<EdgeConfig>,
}
