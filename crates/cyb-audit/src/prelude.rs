//! Convenience re-exports for downstream crates.

pub use crate::chain::{AuditLog, ChainVerification, RotationRecord, VerificationFailure};
pub use crate::entry::{AuditEntry, EntryMetadata, ZERO_HASH};
pub use crate::error::{AuditError, AuditResult};
pub use crate::sanitize::sanitize;
