//! Chain selection by episode kind (spec §4.10).

use crate::episode::EpisodeKind;
use crate::provider::ProviderId;

use ProviderId::{Anthropic, OpenAi, Ollama, Together};

/// The provider chain tried, in order, for `kind`, unless
/// [`crate::provider::AnalyzeOpts::override_chain`] is set.
#[must_use]
pub fn chain_for_kind(kind: EpisodeKind) -> Vec<ProviderId> {
    match kind {
        EpisodeKind::PolicyReview | EpisodeKind::ComplianceCheck => vec![Anthropic, Ollama],
        EpisodeKind::CodeGen | EpisodeKind::Optimization => vec![OpenAi, Together, Anthropic],
        EpisodeKind::RootCause => vec![Anthropic, Together, OpenAi],
        EpisodeKind::AnomalyDetection => vec![Together, Anthropic, Ollama],
        EpisodeKind::Prediction => vec![Together, Anthropic, OpenAi],
        EpisodeKind::Classification => vec![Together, OpenAi, Ollama],
    }
}
