//! The auth manager itself (C2): wires password hashing, JWT issuance,
//! API-key hashing, and the session/API-key tables behind one API.

use std::collections::BTreeMap;
use std::sync::Arc;

use cyb_core::{ApiKeyId, ErrorKind, SessionId, TenantId, Timestamp, UserId};
use cyb_crypto::{ChainSigner, PasswordHasherService};
use cyb_storage::KvStore;
use cyb_telemetry::{TelemetryBus, TelemetryEvent};
use jsonwebtoken::Algorithm;
use rand::RngCore;

use crate::error::{AuthResult, auth_error, storage_error};
use crate::failures::FailureTracker;
use crate::jwt::{DEFAULT_SESSION_TTL_SECS, JwtCodec};
use crate::model::{ApiKey, AuthContext, AuthTokens, Role, Session, User};

const NS_USERS_BY_NAME: &str = "auth:users";
const NS_SESSIONS_BY_JWT: &str = "auth:sessions";
const NS_SESSIONS_BY_REFRESH: &str = "auth:refresh";
const NS_API_KEYS: &str = "auth:api_keys";

/// Options accepted by [`AuthManager::create_api_key`].
#[derive(Debug, Clone, Default)]
pub struct ApiKeyOptions {
    pub ttl_secs: Option<i64>,
}

/// The auth manager. Holds no long-lived locks across `.await` points: the
/// expiry index is a short-held `parking_lot::Mutex` over a sorted map,
/// giving the sweeper O(log n + k) eviction per spec's invariant.
pub struct AuthManager {
    store: Arc<dyn KvStore>,
    password_hasher: PasswordHasherService,
    jwt_codec: JwtCodec,
    api_key_signer: ChainSigner,
    failures: FailureTracker,
    telemetry: Arc<TelemetryBus>,
    expiry_index: parking_lot::Mutex<BTreeMap<i64, String>>,
}

impl AuthManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn KvStore>,
        password_hasher: PasswordHasherService,
        jwt_codec: JwtCodec,
        api_key_signer: ChainSigner,
        telemetry: Arc<TelemetryBus>,
    ) -> Self {
        Self {
            store,
            password_hasher,
            jwt_codec,
            api_key_signer,
            failures: FailureTracker::new(),
            telemetry,
            expiry_index: parking_lot::Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a user directly (no operation in spec's HTTP surface
    /// creates users; they come from `CYBERNETIC_USER_<NAME>` env vars or
    /// admin tooling). Used by the config loader and tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to write.
    pub async fn upsert_user(&self, user: User) -> AuthResult<()> {
        let bytes = serde_json::to_vec(&user).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        self.store
            .set(NS_USERS_BY_NAME, &user.username, bytes)
            .await
            .map_err(storage_error)
    }

    /// List every registered user. Used by admin tooling; never exposed
    /// over the HTTP edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to scan.
    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        let entries = self.store.scan_prefix(NS_USERS_BY_NAME, "").await.map_err(storage_error)?;
        entries
            .into_iter()
            .map(|e| serde_json::from_slice(&e.value).map_err(|err| auth_error(ErrorKind::ServerError, err.to_string())))
            .collect()
    }

    async fn find_user(&self, username: &str) -> AuthResult<Option<User>> {
        let Some(bytes) = self.store.get(NS_USERS_BY_NAME, username).await.map_err(storage_error)? else {
            return Ok(None);
        };
        let user = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        Ok(Some(user))
    }

    /// Authenticate with a username/password, returning fresh session
    /// tokens.
    ///
    /// Failure semantics (spec §4.2): a blocked username, a missing user,
    /// a tenant mismatch, and a wrong password are all reported as the
    /// same `invalid_credentials` kind (except the rate-limit case, which
    /// is `too_many_attempts`) so a caller can never distinguish "no such
    /// user" from "wrong password".
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TooManyAttempts`] if the username has ≥5
    /// failures in the last 5 minutes, or [`ErrorKind::InvalidCredentials`]
    /// on any credential mismatch.
    pub async fn authenticate(&self, username: &str, password: &str, tenant_id: Option<TenantId>) -> AuthResult<AuthTokens> {
        if self.failures.is_blocked(username) {
            return Err(auth_error(ErrorKind::TooManyAttempts, "too many failed attempts"));
        }

        let user = self.find_user(username).await?;
        let Some(user) = user else {
            self.failures.record_failure(username);
            return Err(auth_error(ErrorKind::InvalidCredentials, "invalid credentials"));
        };

        if let Some(requested_tenant) = tenant_id {
            if requested_tenant != user.tenant_id {
                self.failures.record_failure(username);
                return Err(auth_error(ErrorKind::InvalidCredentials, "invalid credentials"));
            }
        }

        let verified = self
            .password_hasher
            .verify(password, &user.password_hash)
            .map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        if !verified {
            self.failures.record_failure(username);
            return Err(auth_error(ErrorKind::InvalidCredentials, "invalid credentials"));
        }

        self.failures.clear(username);
        self.issue_session(user.id, user.tenant_id, user.roles).await
    }

    async fn issue_session(&self, user_id: UserId, tenant_id: TenantId, roles: Vec<Role>) -> AuthResult<AuthTokens> {
        let (jwt, expires_at) = self
            .jwt_codec
            .issue(user_id, tenant_id, roles.clone(), DEFAULT_SESSION_TTL_SECS)
            .map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        let refresh_token = random_token();
        let session = Session {
            id: SessionId::new(),
            jwt: jwt.clone(),
            user_id,
            tenant_id,
            roles,
            created_at: Timestamp::now(),
            expires_at,
            refresh_token: refresh_token.clone(),
        };

        let bytes = serde_json::to_vec(&session).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        self.store.set(NS_SESSIONS_BY_JWT, &jwt, bytes).await.map_err(storage_error)?;
        self.store
            .set(NS_SESSIONS_BY_REFRESH, &refresh_token, jwt.clone().into_bytes())
            .await
            .map_err(storage_error)?;
        self.expiry_index.lock().insert(expires_at.as_millis(), jwt.clone());

        Ok(AuthTokens {
            token: jwt,
            refresh_token,
            expires_in: DEFAULT_SESSION_TTL_SECS,
        })
    }

    /// Authenticate with an API key. Never persists the plaintext key:
    /// only `HMAC-SHA256(secret, key)` is compared.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidToken`] if no key matches, or
    /// [`ErrorKind::TokenExpired`] if it matched but has expired.
    pub async fn authenticate_api_key(&self, key: &str) -> AuthResult<AuthContext> {
        let hashed = self.api_key_signer.sign_hex(key.as_bytes());
        let Some(bytes) = self.store.get(NS_API_KEYS, &hashed).await.map_err(storage_error)? else {
            return Err(auth_error(ErrorKind::InvalidToken, "invalid api key"));
        };
        let api_key: ApiKey = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        if api_key.is_expired(Timestamp::now()) {
            return Err(auth_error(ErrorKind::TokenExpired, "api key expired"));
        }
        Ok(AuthContext {
            user_id: UserId::from_uuid(api_key.id.0),
            tenant_id: api_key.tenant_id,
            roles: api_key.roles,
        })
    }

    /// Validate a bearer token. Fast path: a direct session-table lookup.
    /// Slow path: an externally issued RS256 token is verified against the
    /// configured public key; an HS256 token not in our session table is
    /// always rejected, since we never hand out the HMAC secret to an
    /// external issuer.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::SessionExpired`] for an expired session, or
    /// [`ErrorKind::InvalidToken`] if the token matches neither path.
    pub async fn validate_token(&self, token: &str) -> AuthResult<AuthContext> {
        if let Some(bytes) = self.store.get(NS_SESSIONS_BY_JWT, token).await.map_err(storage_error)? {
            let session: Session = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
            if session.is_expired(Timestamp::now()) {
                self.evict_session(&session).await?;
                return Err(auth_error(ErrorKind::SessionExpired, "session expired"));
            }
            return Ok(AuthContext {
                user_id: session.user_id,
                tenant_id: session.tenant_id,
                roles: session.roles,
            });
        }

        let header = jsonwebtoken::decode_header(token).map_err(|e| auth_error(ErrorKind::InvalidToken, e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(auth_error(ErrorKind::InvalidToken, "unrecognized token"));
        }
        let claims = self
            .jwt_codec
            .verify_rs256(token)
            .map_err(|e| auth_error(ErrorKind::InvalidToken, e.to_string()))?;
        Ok(AuthContext {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            roles: claims.roles,
        })
    }

    async fn evict_session(&self, session: &Session) -> AuthResult<()> {
        self.store.delete(NS_SESSIONS_BY_JWT, &session.jwt).await.map_err(storage_error)?;
        self.store
            .delete(NS_SESSIONS_BY_REFRESH, &session.refresh_token)
            .await
            .map_err(storage_error)?;
        self.expiry_index.lock().remove(&session.expires_at.as_millis());
        Ok(())
    }

    /// Rotate both the JWT and refresh token atomically. The old refresh
    /// token is invalidated even if a later step fails, since it is
    /// removed from the store before the new session is written.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidToken`] if `refresh_token` is unknown.
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<AuthTokens> {
        let Some(jwt_bytes) = self.store.get(NS_SESSIONS_BY_REFRESH, refresh_token).await.map_err(storage_error)? else {
            return Err(auth_error(ErrorKind::InvalidToken, "unknown refresh token"));
        };
        let jwt = String::from_utf8_lossy(&jwt_bytes).to_string();
        let Some(session_bytes) = self.store.get(NS_SESSIONS_BY_JWT, &jwt).await.map_err(storage_error)? else {
            return Err(auth_error(ErrorKind::InvalidToken, "unknown session"));
        };
        let session: Session = serde_json::from_slice(&session_bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;

        self.evict_session(&session).await?;
        self.issue_session(session.user_id, session.tenant_id, session.roles).await
    }

    /// `:all` grants everything; otherwise `resource:action` must be in
    /// the context's derived permission set.
    #[must_use]
    pub fn authorize(&self, ctx: &AuthContext, resource: &str, action: &str) -> bool {
        ctx.authorize(resource, action)
    }

    /// Issue a new API key, returning its id and the plaintext key — the
    /// only time the plaintext is ever available.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to write.
    pub async fn create_api_key(
        &self,
        name: impl Into<String>,
        tenant_id: TenantId,
        roles: Vec<Role>,
        opts: ApiKeyOptions,
    ) -> AuthResult<(ApiKeyId, String)> {
        let plaintext = random_token();
        let hashed_key = self.api_key_signer.sign_hex(plaintext.as_bytes());
        let id = ApiKeyId::new();
        let expires_at = opts.ttl_secs.map(|ttl| Timestamp::now().plus_millis(ttl * 1000));
        let api_key = ApiKey {
            id,
            name: name.into(),
            tenant_id,
            roles,
            hashed_key: hashed_key.clone(),
            created_at: Timestamp::now(),
            expires_at,
        };
        let bytes = serde_json::to_vec(&api_key).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
        self.store.set(NS_API_KEYS, &hashed_key, bytes).await.map_err(storage_error)?;
        Ok((id, plaintext))
    }

    /// Revoke a session (by JWT), a refresh token, or an API key
    /// (plaintext). Tries each table in turn.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`] if `token_or_key` matches nothing.
    pub async fn revoke(&self, token_or_key: &str) -> AuthResult<()> {
        if let Some(bytes) = self.store.get(NS_SESSIONS_BY_JWT, token_or_key).await.map_err(storage_error)? {
            let session: Session = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
            self.evict_session(&session).await?;
            return Ok(());
        }
        if let Some(jwt_bytes) = self.store.get(NS_SESSIONS_BY_REFRESH, token_or_key).await.map_err(storage_error)? {
            let jwt = String::from_utf8_lossy(&jwt_bytes).to_string();
            if let Some(bytes) = self.store.get(NS_SESSIONS_BY_JWT, &jwt).await.map_err(storage_error)? {
                let session: Session = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
                self.evict_session(&session).await?;
                return Ok(());
            }
        }
        let hashed = self.api_key_signer.sign_hex(token_or_key.as_bytes());
        if self.store.get(NS_API_KEYS, &hashed).await.map_err(storage_error)?.is_some() {
            self.store.delete(NS_API_KEYS, &hashed).await.map_err(storage_error)?;
            return Ok(());
        }
        Err(auth_error(ErrorKind::NotFound, "no session or api key matched"))
    }

    /// List every live session. Does not filter expired entries; callers
    /// that need only-live sessions should run [`Self::sweep_expired`]
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to scan.
    pub async fn list_sessions(&self) -> AuthResult<Vec<Session>> {
        let entries = self.store.scan_prefix(NS_SESSIONS_BY_JWT, "").await.map_err(storage_error)?;
        entries
            .into_iter()
            .map(|e| serde_json::from_slice(&e.value).map_err(|err| auth_error(ErrorKind::ServerError, err.to_string())))
            .collect()
    }

    /// Evict every session whose expiry has passed, in `O(log n + k)` by
    /// walking the sorted expiry index rather than scanning every session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to delete an evicted session.
    pub async fn sweep_expired(&self) -> AuthResult<usize> {
        let now_millis = Timestamp::now().as_millis();
        let expired: Vec<(i64, String)> = {
            let index = self.expiry_index.lock();
            index.range(..=now_millis).map(|(k, v)| (*k, v.clone())).collect()
        };

        for (expiry_millis, jwt) in &expired {
            self.store.delete(NS_SESSIONS_BY_JWT, jwt).await.map_err(storage_error)?;
            if let Some(bytes) = self.store.get(NS_SESSIONS_BY_JWT, jwt).await.map_err(storage_error)? {
                let session: Session = serde_json::from_slice(&bytes).map_err(|e| auth_error(ErrorKind::ServerError, e.to_string()))?;
                self.store
                    .delete(NS_SESSIONS_BY_REFRESH, &session.refresh_token)
                    .await
                    .map_err(storage_error)?;
            }
            self.expiry_index.lock().remove(expiry_millis);
        }

        if !expired.is_empty() {
            self.telemetry
                .publish(&TelemetryEvent::new("cyb.auth.sweep", "auth").with_measurement("evicted", expired.len() as f64));
        }
        Ok(expired.len())
    }

    /// Spawn a background task that sweeps expired sessions every
    /// `interval`.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let _ = manager.sweep_expired().await;
            }
        })
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyb_crypto::Argon2Params;
    use cyb_storage::MemoryKvStore;

    fn manager() -> AuthManager {
        AuthManager::new(
            Arc::new(MemoryKvStore::new()),
            PasswordHasherService::new(b"pepper".to_vec(), Argon2Params::default()),
            JwtCodec::new(b"a-very-long-jwt-secret-value-123456".to_vec(), None),
            ChainSigner::new([3u8; 32]),
            Arc::new(TelemetryBus::new()),
        )
    }

    async fn seed_user(manager: &AuthManager, username: &str, password: &str, tenant_id: TenantId) -> User {
        let hash = manager.password_hasher.hash(password).unwrap();
        let user = User {
            id: UserId::new(),
            tenant_id,
            username: username.to_string(),
            password_hash: hash,
            roles: vec![Role::Operator],
        };
        manager.upsert_user(user.clone()).await.unwrap();
        user
    }

    #[tokio::test]
    async fn authenticate_with_correct_password_succeeds() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;

        let tokens = manager.authenticate("alice", "correct horse", None).await.unwrap();
        assert_eq!(tokens.expires_in, DEFAULT_SESSION_TTL_SECS);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_return_the_same_error_kind() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;

        let wrong_password = manager.authenticate("alice", "nope", None).await.unwrap_err();
        let unknown_user = manager.authenticate("nobody", "nope", None).await.unwrap_err();
        assert_eq!(wrong_password.kind, ErrorKind::InvalidCredentials);
        assert_eq!(unknown_user.kind, ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn five_failures_trigger_too_many_attempts() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;

        for _ in 0..5 {
            let _ = manager.authenticate("alice", "wrong", None).await;
        }
        let err = manager.authenticate("alice", "correct horse", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyAttempts);
    }

    #[tokio::test]
    async fn validate_token_returns_context_for_a_live_session() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;
        let tokens = manager.authenticate("alice", "correct horse", None).await.unwrap();

        let ctx = manager.validate_token(&tokens.token).await.unwrap();
        assert_eq!(ctx.tenant_id, tenant);
    }

    #[tokio::test]
    async fn refresh_token_rotates_and_invalidates_the_old_one() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;
        let tokens = manager.authenticate("alice", "correct horse", None).await.unwrap();

        let refreshed = manager.refresh_token(&tokens.refresh_token).await.unwrap();
        assert_ne!(refreshed.token, tokens.token);
        assert!(manager.refresh_token(&tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn api_key_round_trips_through_hmac_lookup() {
        let manager = manager();
        let tenant = TenantId::new();
        let (_, plaintext) = manager
            .create_api_key("ci-bot", tenant, vec![Role::Agent], ApiKeyOptions::default())
            .await
            .unwrap();

        let ctx = manager.authenticate_api_key(&plaintext).await.unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert!(manager.authenticate_api_key("not-a-real-key").await.is_err());
    }

    #[tokio::test]
    async fn revoke_removes_a_live_session() {
        let manager = manager();
        let tenant = TenantId::new();
        seed_user(&manager, "alice", "correct horse", tenant).await;
        let tokens = manager.authenticate("alice", "correct horse", None).await.unwrap();

        manager.revoke(&tokens.token).await.unwrap();
        assert!(manager.validate_token(&tokens.token).await.is_err());
    }

    #[tokio::test]
    async fn authorize_checks_the_context_permission_set() {
        let manager = manager();
        let ctx = AuthContext {
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::Viewer],
        };
        assert!(manager.authorize(&ctx, "audit", "read"));
        assert!(!manager.authorize(&ctx, "hooks", "manage"));
    }
}
