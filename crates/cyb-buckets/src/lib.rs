//! Per-tenant container lifecycle (C13): the durable home for content the
//! ingest pipeline (C9) has fetched, normalized, and extracted. Containers
//! are immutable once created; `embedding_ref` is left as an opaque handle
//! for a pluggable, out-of-scope embedding/vector-index adapter.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod container;
pub mod error;
pub mod prelude;
pub mod store;

pub use container::{Container, ContainerMetadata};
pub use error::{BucketError, BucketResult};
pub use store::BucketStore;
