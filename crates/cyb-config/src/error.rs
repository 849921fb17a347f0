//! Configuration errors, and the process exit codes they and their
//! siblings map to at the daemon/CLI entrypoint (spec §6).

use thiserror::Error;

/// Failures raised while loading and validating the environment-variable
/// configuration surface.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("{name} must be at least {min_bytes} bytes, got {actual}")]
    TooShort {
        name: &'static str,
        min_bytes: usize,
        actual: usize,
    },

    #[error("{name} is not valid base64: {source}")]
    InvalidBase64 {
        name: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{name} must decode to exactly {expected} bytes, got {actual}")]
    WrongDecodedLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed user declaration {var}: expected <password>:<role,role...>")]
    MalformedUser { var: String },

    #[error("user declaration {var} names no roles")]
    NoRoles { var: String },
}

/// Convenience alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// The fixed exit codes a process built on this crate's configuration
/// surface reports at startup (spec §6): `0` normal, `64` config error,
/// `69` a dependency (storage, bus) was unavailable at boot, `70` an
/// internal/unexpected error (e.g. a startup panic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    ConfigError = 64,
    DependencyUnavailable = 69,
    Internal = 70,
}

impl ExitCode {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(_: &ConfigError) -> Self {
        ExitCode::ConfigError
    }
}
