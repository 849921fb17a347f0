//! JWT issuance and verification.
//!
//! Sessions created by this crate are always signed HS256 with
//! `JWT_SECRET`. `validate_token`'s slow path also accepts externally
//! issued RS256 tokens (verified against a configured public key) since
//! the session HMAC secret can never be handed to an external issuer;
//! HS256 tokens that aren't in our own session table are rejected rather
//! than verified, because we'd otherwise be trusting an attacker-supplied
//! `alg: HS256` header against our own secret used as a public value.

use cyb_core::{TenantId, Timestamp, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Role;

/// Default session lifetime (spec §3: JWT TTL ≈ 1h).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
}

/// Errors raised while encoding or decoding a JWT.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("jwt error: {0}")]
    Jsonwebtoken(#[from] jsonwebtoken::errors::Error),
    #[error("no RS256 verification key configured for externally issued tokens")]
    NoRs256Key,
}

/// Issues and verifies the HS256 tokens this service signs itself, and
/// verifies (never issues) RS256 tokens from an external issuer.
pub struct JwtCodec {
    hs256_secret: Vec<u8>,
    rs256_public_key: Option<Vec<u8>>,
}

impl JwtCodec {
    #[must_use]
    pub fn new(hs256_secret: Vec<u8>, rs256_public_key: Option<Vec<u8>>) -> Self {
        Self {
            hs256_secret,
            rs256_public_key,
        }
    }

    /// Sign a fresh HS256 session token.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError`] if encoding fails.
    pub fn issue(&self, user_id: UserId, tenant_id: TenantId, roles: Vec<Role>, ttl_secs: i64) -> Result<(String, Timestamp), JwtError> {
        let now = Timestamp::now();
        let expires_at = now.plus_millis(ttl_secs * 1000);
        let claims = Claims {
            sub: user_id,
            tenant_id,
            roles,
            exp: expires_at.as_millis() / 1000,
            iat: now.as_millis() / 1000,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(&self.hs256_secret))?;
        Ok((token, expires_at))
    }

    /// Verify an RS256 token against the configured public key. Used only
    /// on `validate_token`'s slow path for tokens not found in the session
    /// table.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::NoRs256Key`] if no public key is configured, or
    /// a decode error if the token is malformed, expired, or mis-signed.
    pub fn verify_rs256(&self, token: &str) -> Result<Claims, JwtError> {
        let Some(key) = &self.rs256_public_key else {
            return Err(JwtError::NoRs256Key);
        };
        let decoding_key = DecodingKey::from_rsa_pem(key).map_err(JwtError::Jsonwebtoken)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(data.claims)
    }
}
