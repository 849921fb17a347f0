//! `POST /v1/generate` (spec §4.14): bearer-authenticated bridge to the
//! LLM router (C10).

use axum::Json;
use axum::extract::State;
use cyb_core::{ErrorKind, Priority};
use cyb_llm::{AnalyzeOpts, Episode, EpisodeKind, ProviderId};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::metrics::RequestTimer;
use crate::state::AppState;

/// Request body for `POST /v1/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub episode_kind: EpisodeKind,
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub override_chain: Option<Vec<ProviderId>>,
}

fn default_use_cache() -> bool {
    true
}

/// Response body for `POST /v1/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
    pub provider: String,
    pub attempts: u32,
    pub confidence: Option<f64>,
}

/// # Errors
///
/// Returns [`ApiError`] if the caller lacks `generate:invoke`, or if the
/// router exhausts its fallback chain.
pub async fn generate(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let timer = RequestTimer::start("generate", &state.metrics);

    if !ctx.authorize("generate", "invoke") {
        timer.finish(false);
        return Err(ApiError::new(ErrorKind::PermissionDenied, "missing generate:invoke permission"));
    }

    let episode = Episode::new(ctx.tenant_id, req.episode_kind, req.title, serde_json::Value::Null)
        .with_priority(req.priority.unwrap_or(Priority::Normal));

    let mut opts = AnalyzeOpts::new(req.prompt).with_use_cache(req.use_cache);
    if let Some(model) = req.model {
        opts.model = Some(model);
    }
    if let Some(chain) = req.override_chain {
        opts = opts.with_override_chain(chain);
    }

    match state.router.analyze(&episode, opts).await {
        Ok((output, meta)) => {
            timer.finish(true);
            Ok(Json(GenerateResponse {
                text: output.text,
                provider: meta.provider,
                attempts: meta.attempts,
                confidence: output.confidence,
            }))
        }
        Err(e) => {
            timer.finish(false);
            Err(ApiError::new(e.kind(), e.to_string()))
        }
    }
}
