//! Maps [`CybernikError`] onto an HTTP response using the canonical
//! [`ErrorKind::http_status`] table, so every crate's errors surface at
//! the edge the same way without this crate re-deriving a status mapping
//! of its own.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cyb_core::{CybernikError, ErrorKind};
use serde::Serialize;

/// The body returned for any non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// An error that has crossed the HTTP boundary, carrying the status it
/// maps to.
#[derive(Debug)]
pub struct ApiError(pub CybernikError);

impl From<CybernikError> for ApiError {
    fn from(e: CybernikError) -> Self {
        Self(e)
    }
}

impl ApiError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self(CybernikError::new(kind, message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: self.0.kind.to_string(),
            message: self.0.message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_kind_maps_to_401() {
        let err = ApiError::new(ErrorKind::InvalidCredentials, "bad password");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rate_limited_kind_maps_to_429() {
        let err = ApiError::new(ErrorKind::RateLimited, "slow down");
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
