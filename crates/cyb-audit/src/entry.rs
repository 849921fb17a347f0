//! The audit entry type and its canonical signing representation.
//!
//! `signature = HMAC(signing_key, canonical_json(entry_without_signature))`.
//! Canonicalization relies on `serde_json::Value`'s map being key-sorted
//! (this workspace does not enable `serde_json`'s `preserve_order`
//! feature), so round-tripping an entry through `Value` before signing
//! yields the same bytes regardless of struct field declaration order.

use cyb_core::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuditResult;

/// Correlates an entry back to the request/session that produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Identifies the node/process that appended the entry, for multi-node
    /// deployments sharing one chain.
    pub node: String,
    pub correlation_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
}

/// A single immutable record in the audit hash chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub ts: Timestamp,
    pub event_type: String,
    /// Who performed the action (username, service name, or `"system"`).
    pub actor: String,
    /// Sanitized event payload (see [`crate::sanitize::sanitize`]).
    pub data: serde_json::Value,
    pub metadata: EntryMetadata,
    /// Hex-encoded HMAC of the predecessor entry; the zero hash for
    /// genesis.
    pub previous_hash: String,
    /// Hex-encoded HMAC over this entry's own canonical form.
    pub signature: String,
}

/// Sentinel `previous_hash` for the genesis entry: no predecessor exists.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Serialize)]
struct Signable<'a> {
    id: Uuid,
    ts: Timestamp,
    event_type: &'a str,
    actor: &'a str,
    data: &'a serde_json::Value,
    metadata: &'a EntryMetadata,
    previous_hash: &'a str,
}

impl AuditEntry {
    /// Bytes fed to the HMAC: the entry's canonical JSON with every map's
    /// keys sorted and no signature field.
    ///
    /// # Errors
    ///
    /// Returns an error only if the entry's `data` contains non-JSON-safe
    /// floats (NaN/Infinity), which should never reach a stored entry.
    pub fn signing_bytes(&self) -> AuditResult<Vec<u8>> {
        let signable = Signable {
            id: self.id,
            ts: self.ts,
            event_type: &self.event_type,
            actor: &self.actor,
            data: &self.data,
            metadata: &self.metadata,
            previous_hash: &self.previous_hash,
        };
        let canonical = serde_json::to_value(&signable)?;
        Ok(serde_json::to_vec(&canonical)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_sixty_four_hex_zeros() {
        assert_eq!(ZERO_HASH.len(), 64);
        assert!(ZERO_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn signing_bytes_are_stable_across_field_reordering() {
        let entry = AuditEntry {
            id: Uuid::nil(),
            ts: Timestamp::from_millis(0).unwrap(),
            event_type: "auth_success".to_string(),
            actor: "alice".to_string(),
            data: serde_json::json!({"b": 1, "a": 2}),
            metadata: EntryMetadata::default(),
            previous_hash: ZERO_HASH.to_string(),
            signature: String::new(),
        };
        let bytes = entry.signing_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // serde_json's Value map is sorted, so "a" precedes "b" regardless
        // of insertion order.
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }
}
