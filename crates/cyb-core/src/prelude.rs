//! Convenience re-exports for downstream crates.
//!
//! ```
//! use cyb_core::prelude::*;
//! ```

pub use crate::error::{CybernikError, CybernikResult, ErrorKind};
pub use crate::ids::{ApiKeyId, ContainerId, EpisodeId, HookId, JobId, SessionId, TenantId, UserId};
pub use crate::permission::{Permission, Severity};
pub use crate::priority::Priority;
pub use crate::time::Timestamp;
