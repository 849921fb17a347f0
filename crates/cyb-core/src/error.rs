//! Canonical error kinds shared across every component.
//!
//! Every component-level error type carries one of these kinds so that the
//! HTTP edge, the bus's nack/dead-letter logic, and the telemetry bus can
//! dispatch on a closed, stable vocabulary instead of matching on each
//! crate's own error enum.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The fixed set of error kinds every component classifies its failures
/// into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCredentials,
    TooManyAttempts,
    TokenExpired,
    InvalidToken,
    SessionExpired,
    Unauthorized,
    RateLimited,
    CircuitOpen,
    Timeout,
    InvalidResponse,
    ServerError,
    RequestFailed,
    BlockedHost,
    InvalidUrl,
    ContentTooLarge,
    RedirectBlocked,
    UnsupportedContentType,
    NotFound,
    PermissionDenied,
    StorageError,
    AllProvidersFailed,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying locally (the LLM
    /// router's fallback chain, the bus's nack/requeue path). Persistent
    /// errors are surfaced to the caller without retry.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::InvalidResponse | Self::CircuitOpen
        )
    }

    /// The HTTP status the edge (C14) maps this kind to.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::TokenExpired
            | Self::InvalidToken
            | Self::SessionExpired => 401,
            Self::Unauthorized | Self::PermissionDenied => 403,
            Self::RateLimited | Self::TooManyAttempts => 429,
            Self::InvalidUrl
            | Self::ContentTooLarge
            | Self::UnsupportedContentType
            | Self::RedirectBlocked => 400,
            Self::NotFound => 404,
            Self::CircuitOpen
            | Self::Timeout
            | Self::ServerError
            | Self::RequestFailed
            | Self::AllProvidersFailed
            | Self::BlockedHost
            | Self::StorageError
            | Self::InvalidResponse => 503,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::TooManyAttempts => "too_many_attempts",
            Self::TokenExpired => "token_expired",
            Self::InvalidToken => "invalid_token",
            Self::SessionExpired => "session_expired",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::CircuitOpen => "circuit_open",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::ServerError => "server_error",
            Self::RequestFailed => "request_failed",
            Self::BlockedHost => "blocked_host",
            Self::InvalidUrl => "invalid_url",
            Self::ContentTooLarge => "content_too_large",
            Self::RedirectBlocked => "redirect_blocked",
            Self::UnsupportedContentType => "unsupported_content_type",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::StorageError => "storage_error",
            Self::AllProvidersFailed => "all_providers_failed",
        };
        write!(f, "{s}")
    }
}

/// A classified error carrying both the canonical [`ErrorKind`] and a
/// human-readable message, used at component boundaries where only the kind
/// and a description need to cross (telemetry, bus nack reasons, HTTP
/// bodies).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct CybernikError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CybernikError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias for fallible operations that only need to propagate a
/// classified error.
pub type CybernikResult<T> = Result<T, CybernikError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_match_spec_list() {
        assert!(ErrorKind::RateLimited.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::InvalidResponse.is_transient());
        assert!(ErrorKind::CircuitOpen.is_transient());
        assert!(!ErrorKind::InvalidCredentials.is_transient());
        assert!(!ErrorKind::BlockedHost.is_transient());
    }

    #[test]
    fn http_status_mapping_matches_spec() {
        assert_eq!(ErrorKind::InvalidCredentials.http_status(), 401);
        assert_eq!(ErrorKind::Unauthorized.http_status(), 403);
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::InvalidUrl.http_status(), 400);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::AllProvidersFailed.http_status(), 503);
    }

    #[test]
    fn display_uses_snake_case_matching_wire_kind() {
        assert_eq!(ErrorKind::TooManyAttempts.to_string(), "too_many_attempts");
    }
}
