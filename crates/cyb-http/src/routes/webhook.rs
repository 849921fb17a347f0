//! `POST /telegram/webhook` (spec §4.14): HMAC-signature-verified inbound
//! messages, forwarded onto the bus as an S1 operation, per-chat rate
//! limited.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use cyb_bus::Envelope;
use cyb_core::{ErrorKind, Priority};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ApiError;
use crate::metrics::RequestTimer;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// The subset of a Telegram update this edge cares about.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: TelegramMessage,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub accepted: bool,
}

fn verify_signature(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let Ok(expected) = hex::decode(provided) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// # Errors
///
/// Returns [`ApiError`] if the signature is missing/invalid, or if the
/// sender has exceeded its per-chat budget.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let timer = RequestTimer::start("telegram_webhook", &state.metrics);

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        timer.finish(false);
        return Err(ApiError::new(ErrorKind::Unauthorized, "missing webhook signature"));
    };

    if !verify_signature(&state.config.telegram_webhook_secret, &body, signature) {
        timer.finish(false);
        return Err(ApiError::new(ErrorKind::Unauthorized, "invalid webhook signature"));
    }

    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            timer.finish(false);
            return Err(ApiError::new(ErrorKind::InvalidResponse, format!("malformed telegram update: {e}")));
        }
    };

    let chat_id = update.message.chat.id.to_string();
    if state
        .ratelimiter
        .request_tokens(&state.config.webhook_budget, &chat_id, Priority::Normal)
        .is_err()
    {
        timer.finish(false);
        return Err(ApiError::new(ErrorKind::RateLimited, "chat is sending too fast"));
    }

    let payload = serde_json::json!({
        "update_id": update.update_id,
        "chat_id": update.message.chat.id,
        "text": update.message.text,
    });
    let envelope = Envelope::new("vsm.s1.operation", payload, state.config.default_tenant);

    match state.bus.publish("cyb", "vsm.s1.operation", envelope).await {
        Ok(()) => {
            timer.finish(true);
            Ok(Json(WebhookAck { accepted: true }))
        }
        Err(e) => {
            timer.finish(false);
            Err(ApiError::new(ErrorKind::ServerError, e.to_string()))
        }
    }
}
