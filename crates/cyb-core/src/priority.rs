//! Episode/request priority, shared by the rate limiter (C5) — which scales
//! a budget's effective limit per priority — and the LLM router (C10),
//! which threads an episode's priority through to the budget check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-declared urgency. Ordered low to critical so `>=` comparisons
/// (e.g. CEP severity-style thresholds) read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    /// Multiplier applied to a rate-limit budget's base token limit for
    /// this priority. `Normal` is the unscaled baseline.
    #[must_use]
    pub fn limit_multiplier(self) -> f64 {
        match self {
            Self::Low => 0.5,
            Self::Normal => 1.0,
            Self::High => 1.5,
            Self::Critical => 2.0,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}
