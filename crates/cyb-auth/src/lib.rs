//! Auth manager (C2): password + JWT + API-key issuance/validation, RBAC,
//! rate-limited auth attempts, atomic refresh-token rotation.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod failures;
pub mod jwt;
pub mod manager;
pub mod model;
pub mod prelude;
pub mod tenant;

pub use error::AuthResult;
pub use failures::FailureTracker;
pub use jwt::{Claims, JwtCodec, JwtError, DEFAULT_SESSION_TTL_SECS};
pub use manager::{ApiKeyOptions, AuthManager};
pub use model::{ApiKey, AuthContext, AuthTokens, Role, Session, UnknownRole, User};
pub use tenant::{Tenant, TenantDirectory};
