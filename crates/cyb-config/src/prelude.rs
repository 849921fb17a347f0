//! Convenience re-exports for downstream crates.

pub use crate::error::{ConfigError, ConfigResult, ExitCode};
pub use crate::settings::{Settings, UserDeclaration};
