//! Wires every `cyb-*` service into a running control plane: storage,
//! auth, audit, telemetry, the bus, rate limiting, the breaker, the
//! deterministic cache, the LLM router, the five VSM tiers, and the HTTP
//! edge (spec §9 data flow, §6 startup sequencing).
//!
//! Split from `main.rs` (grounded on the teacher's kernel/daemon
//! separation) so integration tests can call [`bootstrap`] directly
//! without going through a process entrypoint.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod bootstrap;
pub mod users;

pub use bootstrap::{Services, bootstrap};
