//! Identifier newtypes shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing `Uuid`.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from the canonical hyphenated representation.
            ///
            /// # Errors
            ///
            /// Returns an error if `s` is not a valid UUID string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifies a tenant (isolation boundary for sessions, audit entries,
    /// budgets and containers).
    TenantId,
    "tenant"
);
uuid_id!(
    /// Identifies an authenticated user within a tenant.
    UserId,
    "user"
);
uuid_id!(
    /// Identifies a login session (access/refresh token pair).
    SessionId,
    "session"
);
uuid_id!(
    /// Identifies an issued API key.
    ApiKeyId,
    "apikey"
);
uuid_id!(
    /// Identifies an episode submitted to the LLM router.
    EpisodeId,
    "episode"
);
uuid_id!(
    /// Identifies a registered CEP hook.
    HookId,
    "hook"
);
uuid_id!(
    /// Identifies a per-tenant container (storage bucket).
    ContainerId,
    "container"
);
uuid_id!(
    /// Identifies an ingest pipeline job (sync or async).
    JobId,
    "job"
);
