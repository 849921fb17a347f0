//! CEP hook engine (C8): pattern-matched events accumulate in a per-hook
//! sliding window until a count or rate threshold is satisfied, at which
//! point the hook's action fires.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod hook;
pub mod matcher;
pub mod prelude;
pub mod window;

pub use engine::{Callback, FiredHook, HookEngine};
pub use error::{HookError, HookResult};
pub use hook::{Action, Hook, Pattern, Threshold};
pub use matcher::{Matcher, RankCmp};
pub use window::WindowState;
