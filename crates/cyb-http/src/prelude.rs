//! Convenience re-exports for downstream crates.

pub use crate::error::{ApiError, ErrorBody};
pub use crate::extract::Authenticated;
pub use crate::metrics::EdgeMetrics;
pub use crate::server::build_router;
pub use crate::sse::{SseHub, SseMessage};
pub use crate::state::{AppState, EdgeConfig};
