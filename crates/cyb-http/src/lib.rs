//! External interfaces (C14): the HTTP edge the admin CLI and outside
//! callers reach the control plane through. `POST /v1/generate` bridges a
//! bearer-authenticated caller to the LLM router (C10); `GET /v1/events` is
//! a Server-Sent-Events feed off the telemetry bus; `POST /telegram/webhook`
//! verifies an HMAC signature and forwards the message onto the bus as an
//! S1 operation; `GET /metrics` and `GET /health` are the usual ops
//! surface.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod extract;
pub mod metrics;
pub mod prelude;
pub mod routes;
pub mod server;
pub mod sse;
pub mod state;

pub use error::ApiError;
pub use metrics::EdgeMetrics;
pub use server::build_router;
pub use sse::SseHub;
pub use state::AppState;
