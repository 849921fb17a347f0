//! `GET /v1/events` (spec §4.14): a Server-Sent-Events feed off the
//! telemetry bus, via [`crate::sse::SseHub`].

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use cyb_core::ErrorKind;
use futures::stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::sse::SseMessage;
use crate::state::AppState;

/// # Errors
///
/// Returns [`ApiError`] if the caller lacks `events:read`.
pub async fn events(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if !ctx.authorize("events", "read") {
        return Err(ApiError::new(ErrorKind::PermissionDenied, "missing events:read permission"));
    }

    let (id, rx) = state.sse.subscribe();
    state.metrics.sse_connected();

    let sse = state.sse.clone();
    let metrics = state.metrics.clone();
    let stream = ReceiverStream::new(rx).map(move |msg| {
        let event = match &msg {
            SseMessage::Heartbeat => Event::default().event("heartbeat").data("{}"),
            SseMessage::Event { .. } => Event::default()
                .event("message")
                .data(serde_json::to_string(&msg).unwrap_or_else(|_| "{}".to_string())),
        };
        Ok(event)
    });

    let guarded = DisconnectGuard {
        inner: stream,
        hub: sse,
        metrics,
        id,
    };

    Ok(Sse::new(guarded).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive")))
}

/// Removes the subscriber from the hub and decrements the connection gauge
/// when the SSE response stream is dropped (client disconnect or server
/// shutdown).
struct DisconnectGuard<S> {
    inner: S,
    hub: std::sync::Arc<crate::sse::SseHub>,
    metrics: std::sync::Arc<crate::metrics::EdgeMetrics>,
    id: uuid::Uuid,
}

impl<S: Stream + Unpin> Stream for DisconnectGuard<S> {
    type Item = S::Item;

    fn poll_next(self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        std::pin::Pin::new(&mut this.inner).poll_next(cx)
    }
}

impl<S> Drop for DisconnectGuard<S> {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
        self.metrics.sse_disconnected();
    }
}
