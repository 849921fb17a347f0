//! Algedonic signals (spec §4.11, §GLOSSARY): out-of-band pain/pleasure
//! indicators that bypass the tier hierarchy and target S3 directly.

use cyb_core::TenantId;
use serde::{Deserialize, Serialize};

/// Pain pushes S3's state machine toward `critical`/`intervening`;
/// pleasure is recorded but never escalates state on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Pain,
    Pleasure,
}

/// One algedonic emission. `severity` is clamped to `[0, 1]` by
/// [`AlgedonicSignal::new`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlgedonicSignal {
    pub tenant_id: TenantId,
    pub kind: SignalKind,
    pub severity: f64,
}

impl SignalKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pain => "pain",
            Self::Pleasure => "pleasure",
        }
    }
}

impl AlgedonicSignal {
    #[must_use]
    pub fn new(tenant_id: TenantId, kind: SignalKind, severity: f64) -> Self {
        Self {
            tenant_id,
            kind,
            severity: severity.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn pain(tenant_id: TenantId, severity: f64) -> Self {
        Self::new(tenant_id, SignalKind::Pain, severity)
    }

    #[must_use]
    pub fn pleasure(tenant_id: TenantId, severity: f64) -> Self {
        Self::new(tenant_id, SignalKind::Pleasure, severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_clamped_to_unit_interval() {
        let s = AlgedonicSignal::pain(TenantId::new(), 1.7);
        assert_eq!(s.severity, 1.0);
        let s = AlgedonicSignal::pain(TenantId::new(), -0.3);
        assert_eq!(s.severity, 0.0);
    }
}
