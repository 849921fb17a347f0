//! Permissions and severity ranking shared by the auth manager (C2) and the
//! CEP hook engine (C8).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `resource:action` permission atom, plus the wildcard `all` grant.
///
/// Stored and compared as an interned string rather than a closed enum:
/// resources and actions are declared per-deployment (tenants can register
/// their own resource kinds), so a compile-time registry would have to be
/// re-opened for every new integration. `all` short-circuits [`Permission::satisfies`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// The wildcard permission granting every resource:action pair.
    pub const ALL: &'static str = "all";

    /// Build a `resource:action` permission.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self(format!("{}:{}", resource.into(), action.into()))
    }

    /// Build the wildcard permission.
    #[must_use]
    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    /// Parse a raw `resource:action` (or `all`) string.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether this permission, held in a context, satisfies a request for
    /// `required`. `all` satisfies everything.
    #[must_use]
    pub fn satisfies(&self, required: &Permission) -> bool {
        self.0 == Self::ALL || self.0 == required.0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity ranking used by the CEP engine's `gte`/`lte`/`gt`/`lt` matchers
/// (spec: critical=4 > high=3 > medium=2 > low=1 > unknown=0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank used for ordered comparisons.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Parse a severity from a free-form string, case-insensitively,
    /// defaulting to [`Severity::Unknown`] for anything unrecognized so the
    /// CEP matcher never errors on an unexpected field value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_satisfies_any_permission() {
        let all = Permission::all();
        let specific = Permission::new("audit", "read");
        assert!(all.satisfies(&specific));
    }

    #[test]
    fn specific_permission_does_not_satisfy_other_resource() {
        let held = Permission::new("audit", "read");
        let required = Permission::new("audit", "write");
        assert!(!held.satisfies(&required));
    }

    #[test]
    fn severity_rank_ordering_matches_spec() {
        assert_eq!(Severity::Critical.rank(), 4);
        assert_eq!(Severity::High.rank(), 3);
        assert_eq!(Severity::Medium.rank(), 2);
        assert_eq!(Severity::Low.rank(), 1);
        assert_eq!(Severity::Unknown.rank(), 0);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn severity_parse_is_case_insensitive_and_falls_back_to_unknown() {
        assert_eq!(Severity::parse("HIGH"), Severity::High);
        assert_eq!(Severity::parse("bogus"), Severity::Unknown);
    }
}
