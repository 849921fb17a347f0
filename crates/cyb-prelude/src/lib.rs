//! One-stop re-export of every `cyb-*` crate's prelude, for binaries
//! (`cyb-daemon`, `cyb-cli`) and integration tests that need the whole
//! surface rather than picking individual crates off the workspace.
//!
//! Library crates should keep depending on the individual `cyb-*` crates
//! they actually need; this crate exists for wiring code at the edges.

#![deny(unsafe_code)]
#![warn(unreachable_pub)]

pub use cyb_audit::prelude::*;
pub use cyb_auth::prelude::*;
pub use cyb_breaker::prelude::*;
pub use cyb_bus::prelude::*;
pub use cyb_buckets::prelude::*;
pub use cyb_cache::prelude::*;
pub use cyb_config::prelude::*;
pub use cyb_core::prelude::*;
pub use cyb_crypto::prelude::*;
pub use cyb_hooks::prelude::*;
pub use cyb_ingest::prelude::*;
pub use cyb_llm::prelude::*;
pub use cyb_policy::prelude::*;
pub use cyb_ratelimit::prelude::*;
pub use cyb_storage::prelude::*;
pub use cyb_telemetry::prelude::*;
pub use cyb_vsm::prelude::*;
