//! Field matchers a [`crate::hook::Hook`] pattern is built from (spec §4.8,
//! §3 `Hook.pattern`).
//!
//! A pattern is `key -> Matcher`; it matches an event when every declared
//! key's matcher is satisfied against the corresponding field. A missing
//! field never satisfies a matcher except [`Matcher::Neq`] (something that
//! isn't present is, definitionally, not equal to the compared value) and
//! [`Matcher::NotContains`]-style negatives are intentionally not offered
//! here since the spec only names the ten matchers below.

use cyb_core::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field-level matcher. Severity comparisons rank `critical=4 >
/// high=3 > medium=2 > low=1 > unknown=0` (spec §4.8) rather than
/// comparing the raw string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    Eq(Value),
    Neq(Value),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    In(Vec<Value>),
    Contains(String),
    #[serde(rename = "regex")]
    Regex(String),
    /// `severity-rank`: compares the field (coerced through
    /// [`Severity::parse`]) against `threshold` using `op`.
    SeverityRank { cmp: RankCmp, threshold: Severity },
}

/// Comparison operator for [`Matcher::SeverityRank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankCmp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Matcher {
    /// Convenience constructor for `{gte, "high"}`-style severity matchers.
    #[must_use]
    pub fn severity_gte(threshold: Severity) -> Self {
        Self::SeverityRank {
            cmp: RankCmp::Gte,
            threshold,
        }
    }

    /// Whether `field` (the event's value at the pattern's declared key,
    /// if present) satisfies this matcher.
    #[must_use]
    pub fn is_satisfied_by(&self, field: Option<&Value>) -> bool {
        match self {
            Self::Eq(expected) => field == Some(expected),
            Self::Neq(expected) => field != Some(expected),
            Self::Gt(n) => field.and_then(Value::as_f64).is_some_and(|v| v > *n),
            Self::Gte(n) => field.and_then(Value::as_f64).is_some_and(|v| v >= *n),
            Self::Lt(n) => field.and_then(Value::as_f64).is_some_and(|v| v < *n),
            Self::Lte(n) => field.and_then(Value::as_f64).is_some_and(|v| v <= *n),
            Self::In(options) => field.is_some_and(|v| options.contains(v)),
            Self::Contains(needle) => match field {
                Some(Value::String(s)) => s.contains(needle.as_str()),
                Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(needle.as_str())),
                _ => false,
            },
            Self::Regex(pattern) => {
                let Ok(re) = regex::Regex::new(pattern) else {
                    return false;
                };
                matches!(field, Some(Value::String(s)) if re.is_match(s))
            }
            Self::SeverityRank { cmp, threshold } => {
                let Some(field) = field else {
                    return false;
                };
                let severity = match field {
                    Value::String(s) => Severity::parse(s),
                    _ => return false,
                };
                let (rank, threshold_rank) = (severity.rank(), threshold.rank());
                match cmp {
                    RankCmp::Gt => rank > threshold_rank,
                    RankCmp::Gte => rank >= threshold_rank,
                    RankCmp::Lt => rank < threshold_rank,
                    RankCmp::Lte => rank <= threshold_rank,
                    RankCmp::Eq => rank == threshold_rank,
                }
            }
        }
    }
}
