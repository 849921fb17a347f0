//! Users, roles, sessions, API keys, and the authorization context they
//! resolve to.

use cyb_core::{Permission, SessionId, TenantId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed roles spec §3 enumerates for a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Viewer,
    Agent,
    System,
}

impl Role {
    /// The permission set this role grants. Admin and System hold the
    /// wildcard; the others are scoped to the operations their role name
    /// implies.
    #[must_use]
    pub fn permissions(self) -> Vec<Permission> {
        match self {
            Self::Admin | Self::System => vec![Permission::all()],
            Self::Operator => vec![
                Permission::new("generate", "invoke"),
                Permission::new("hooks", "manage"),
                Permission::new("containers", "write"),
                Permission::new("audit", "read"),
            ],
            Self::Viewer => vec![
                Permission::new("generate", "read"),
                Permission::new("audit", "read"),
                Permission::new("metrics", "read"),
            ],
            Self::Agent => vec![Permission::new("generate", "invoke"), Permission::new("events", "read")],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
            Self::Agent => "agent",
            Self::System => "system",
        };
        write!(f, "{s}")
    }
}

/// Error returned by [`Role::from_str`] for an unrecognized role name.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "operator" => Ok(Self::Operator),
            "viewer" => Ok(Self::Viewer),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub username: String,
    /// Argon2id PHC string, never the raw password.
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// A live login session, keyed by its JWT and separately by its refresh
/// token so both lookup paths in [`crate::manager::AuthManager`] are O(1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub jwt: String,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub refresh_token: String,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

/// An issued API key. Only the HMAC of the key is ever stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: cyb_core::ApiKeyId,
    pub name: String,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub hashed_key: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl ApiKey {
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

/// The resolved identity and permission set a request carries once
/// authenticated, returned by `validate_token`/`authenticate_api_key` and
/// consumed by `authorize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
}

impl AuthContext {
    #[must_use]
    pub fn permissions(&self) -> Vec<Permission> {
        self.roles.iter().flat_map(|r| r.permissions()).collect()
    }

    /// Whether this context is allowed `resource:action`.
    #[must_use]
    pub fn authorize(&self, resource: &str, action: &str) -> bool {
        let required = Permission::new(resource, action);
        self.permissions().iter().any(|p| p.satisfies(&required))
    }
}

/// Tokens returned by a successful `authenticate`/`refresh_token` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}
