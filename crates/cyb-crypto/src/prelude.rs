//! Convenience re-exports for downstream crates.

pub use crate::hash::ContentHash;
pub use crate::password::{Argon2Params, PasswordError, PasswordHasherService};
pub use crate::signer::{ChainSigner, SignerError};
