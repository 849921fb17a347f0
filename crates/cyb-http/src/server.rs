//! Assembles the axum [`Router`] for the HTTP edge (spec §4.14), grounded
//! on `qc-16-api-gateway`'s `tower`/`tower-http` middleware stack.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{events, generate, health, metrics, webhook};
use crate::state::AppState;

/// The default request timeout applied to every route except the SSE
/// stream, which is exempt since it is meant to stay open indefinitely.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the full router. Callers (the daemon binary, integration tests)
/// supply the wired [`AppState`].
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let timed = Router::new()
        .route("/v1/generate", post(generate::generate))
        .route("/telegram/webhook", post(webhook::telegram_webhook))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let untimed = Router::new()
        .route("/v1/events", get(events::events))
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health));

    timed
        .merge(untimed)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
