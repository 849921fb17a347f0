//! CEP hook engine error types.

use cyb_core::HookId;
use thiserror::Error;

/// Errors raised by the hook engine.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("unknown hook: {0}")]
    UnknownHook(HookId),
    #[error("no callback registered with name: {0}")]
    UnknownCallback(String),
}

/// Result type for hook engine operations.
pub type HookResult<T> = Result<T, HookError>;
