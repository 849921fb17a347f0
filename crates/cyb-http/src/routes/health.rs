//! `GET /health` (spec §4.14): liveness is "the process is answering";
//! readiness checks the bus connection, the audit chain, and declares the
//! breaker/cache as informational (neither blocks readiness on its own,
//! since an open breaker or a cold cache are expected steady states, not
//! outages).

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub bus_connected: bool,
    pub audit_chain_entries: u64,
    pub sse_subscribers: usize,
}

/// Liveness+readiness in one response: `200` when the bus is connected,
/// `503` otherwise so a load balancer stops routing to this instance.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let bus_connected = state.bus.is_connected();
    let audit_chain_entries = state.audit.len().await;
    let sse_subscribers = state.sse.subscriber_count();

    let status = if bus_connected { "ok" } else { "degraded" };
    let code = if bus_connected { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        code,
        Json(HealthResponse {
            status,
            bus_connected,
            audit_chain_entries,
            sse_subscribers,
        }),
    )
}
