//! Canonical LLM router error kinds (spec §4.10, §7).

use cyb_core::ErrorKind;
use thiserror::Error;

/// A provider or router failure, classified to one of spec's canonical
/// kinds so the fallback loop can decide "retry the chain" vs. "abort".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,
    #[error("timeout")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("server error: {0}")]
    ServerError(String),
    #[error("circuit open")]
    CircuitOpen,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("all providers in the chain failed")]
    AllProvidersFailed,
}

impl LlmError {
    /// The canonical cross-cutting [`ErrorKind`] this maps to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Timeout => ErrorKind::Timeout,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Self::ServerError(_) => ErrorKind::ServerError,
            Self::CircuitOpen => ErrorKind::CircuitOpen,
            Self::RequestFailed(_) => ErrorKind::RequestFailed,
            Self::AllProvidersFailed => ErrorKind::AllProvidersFailed,
        }
    }

    /// Whether the router's fallback loop should try the next provider in
    /// the chain (spec §4.10: `rate_limited`/`timeout`/`invalid_response`/
    /// `circuit_open` are transient; anything else aborts the chain).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

/// Result type for router and provider operations.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_match_spec() {
        assert!(LlmError::RateLimited.is_transient());
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::InvalidResponse("x".into()).is_transient());
        assert!(LlmError::CircuitOpen.is_transient());
        assert!(!LlmError::ServerError("x".into()).is_transient());
        assert!(!LlmError::RequestFailed("x".into()).is_transient());
    }
}
