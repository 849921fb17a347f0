//! Convenience re-exports for downstream crates.

pub use crate::error::AuthResult;
pub use crate::jwt::{Claims, JwtCodec, DEFAULT_SESSION_TTL_SECS};
pub use crate::manager::{ApiKeyOptions, AuthManager};
pub use crate::model::{ApiKey, AuthContext, AuthTokens, Role, Session, User};
pub use crate::tenant::{Tenant, TenantDirectory};
