//! Argon2id password hashing for the auth manager (C2).
//!
//! Parameters default to t_cost=3, m_cost=2^16 (64 MiB), parallelism=4, per
//! spec, but are configurable so a deployment can trade memory for
//! throughput.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub t_cost: u32,
    pub m_cost_kib: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            t_cost: 3,
            m_cost_kib: 1 << 16,
            parallelism: 4,
        }
    }
}

/// Errors raised while hashing or verifying passwords.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed: {0}")]
    HashFailed(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// A deployment-wide pepper combined with Argon2's per-password salt.
///
/// The pepper is a deployment secret (`PASSWORD_SALT`), distinct from the
/// random salt Argon2 generates per call; both are required to reproduce a
/// hash, so a stolen password database alone is insufficient to brute-force
/// offline.
#[derive(Clone)]
pub struct PasswordHasherService {
    pepper: Vec<u8>,
    params: Argon2Params,
}

impl PasswordHasherService {
    #[must_use]
    pub fn new(pepper: Vec<u8>, params: Argon2Params) -> Self {
        Self { pepper, params }
    }

    fn engine(&self) -> Result<Argon2<'_>, PasswordError> {
        let params = Params::new(
            self.params.m_cost_kib,
            self.params.t_cost,
            self.params.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn peppered(&self, password: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(password.len() + self.pepper.len());
        buf.extend_from_slice(password.as_bytes());
        buf.extend_from_slice(&self.pepper);
        buf
    }

    /// Hash `password`, returning the PHC string form suitable for storage.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError`] if the configured parameters are invalid or
    /// hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let peppered = self.peppered(password);
        let hash = self
            .engine()?
            .hash_password(&peppered, &salt)
            .map_err(|e| PasswordError::HashFailed(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify `password` against a stored PHC hash string.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::MalformedHash`] if `stored` is not a valid
    /// PHC string. Returns `Ok(false)` (not an error) on a plain mismatch.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        let peppered = self.peppered(password);
        Ok(self.engine()?.verify_password(&peppered, &parsed).is_ok())
    }
}

impl std::fmt::Debug for PasswordHasherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasherService").finish_non_exhaustive()
    }
}
