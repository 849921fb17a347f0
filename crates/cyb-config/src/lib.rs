//! Environment-variable configuration loader (spec §6): the minimum set of
//! variables every deployment must provide, validated once at startup, and
//! the exit-code vocabulary the daemon and CLI entrypoints report through.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod prelude;
pub mod settings;

pub use error::{ConfigError, ConfigResult, ExitCode};
pub use settings::{Settings, UserDeclaration};
