//! Cache fingerprinting for the LLM router (spec §4.10 Open Question:
//! the cache key is `sha256(episode.kind || ' ' || normalize(prompt) || '
//! ' || model_policy_id)`, where `normalize` lowercases, collapses
//! whitespace, and strips trailing punctuation).

use crate::episode::EpisodeKind;

/// Lowercase, collapse runs of whitespace to a single space, trim, and
/// strip trailing punctuation.
#[must_use]
pub fn normalize(prompt: &str) -> String {
    let lowered = prompt.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}

/// The literal string hashed to form the cache key: `kind normalize(prompt)
/// model_policy_id`. Callers pass this to [`cyb_crypto::ContentHash::hash`]
/// when consulting the deterministic cache.
#[must_use]
pub fn fingerprint(kind: EpisodeKind, prompt: &str, model_policy_id: &str) -> String {
    format!("{} {} {}", kind.as_str(), normalize(prompt), model_policy_id)
}
