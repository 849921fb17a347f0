//! The `Authorization: Bearer <token>` extractor every protected route
//! pulls an [`AuthContext`] from.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use cyb_auth::AuthContext;
use cyb_core::ErrorKind;

use crate::error::ApiError;
use crate::state::AppState;

/// A request's resolved identity, extracted by validating the bearer
/// token against [`cyb_auth::AuthManager`].
pub struct Authenticated(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::new(ErrorKind::Unauthorized, "missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::new(ErrorKind::Unauthorized, "expected a bearer token"))?;

        let State(state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .expect("AppState extraction is infallible");

        let ctx = state.auth.validate_token(token).await?;
        Ok(Self(ctx))
    }
}
