//! Convenience re-exports for downstream crates.

pub use crate::container::{Container, ContainerMetadata};
pub use crate::error::{BucketError, BucketResult};
pub use crate::store::BucketStore;
