//! Ambient tracing setup.
//!
//! Every binary in the workspace (`cyb-daemon`, `cyb-cli`) calls
//! [`setup_logging`] once at startup; library crates only ever emit through
//! the `tracing` macros and never install a subscriber themselves.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line, for interactive terminals.
    Pretty,
    /// Single-line-per-event, for log aggregators that don't parse JSON.
    Compact,
    /// Newline-delimited JSON, for shipping to a structured log pipeline.
    Json,
}

/// Logging configuration resolved at startup from `RUST_LOG`/CLI flags.
#[derive(Debug, Clone)]
pub struct LogConfig {
    default_directive: String,
    format: LogFormat,
    extra_directives: Vec<String>,
    ansi: bool,
}

impl LogConfig {
    /// Start from a base level (`"info"`, `"debug"`, ...).
    #[must_use]
    pub fn new(default_level: impl Into<String>) -> Self {
        Self {
            default_directive: default_level.into(),
            format: LogFormat::Compact,
            extra_directives: Vec::new(),
            ansi: true,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add an additional per-target directive, e.g. `"cyb_bus=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.default_directive)
            .map_err(|e| TelemetryError::InvalidDirective(e.to_string()))?;
        for directive in &self.extra_directives {
            let directive = directive
                .parse()
                .map_err(|_| TelemetryError::InvalidDirective(directive.clone()))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }
}

/// Install a global tracing subscriber built from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError`] if a directive is malformed or a global
/// subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(config.ansi))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_ansi(config.ansi))
            .try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install a global subscriber using `RUST_LOG` (falling back to `info`)
/// and compact formatting — the default for `cyb-daemon`.
///
/// # Errors
///
/// Returns [`TelemetryError`] if a global subscriber is already installed.
pub fn setup_default_logging() -> TelemetryResult<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    setup_logging(&LogConfig::new(level))
}
