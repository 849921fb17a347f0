//! Convenience re-exports for downstream crates.

pub use crate::engine::{Callback, FiredHook, HookEngine};
pub use crate::error::{HookError, HookResult};
pub use crate::hook::{Action, Hook, Pattern, Threshold};
pub use crate::matcher::{Matcher, RankCmp};
pub use crate::window::WindowState;
