//! Append-only, hash-chained audit log (C3): every security-relevant
//! action across the platform is sanitized, signed, and chained here so
//! tampering with history is detectable by `verify_integrity`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod chain;
pub mod entry;
pub mod error;
pub mod prelude;
pub mod sanitize;

pub use chain::{AuditLog, ChainVerification, RotationRecord, VerificationFailure};
pub use entry::{AuditEntry, EntryMetadata, ZERO_HASH};
pub use error::{AuditError, AuditResult};
pub use sanitize::sanitize;
