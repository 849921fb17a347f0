//! The append-only hash chain itself: append, verify, rotate.
//!
//! Appends are strictly serialized by a single `tokio::sync::Mutex` guarding
//! the chain head, per spec's single-writer requirement — concurrent
//! appenders would otherwise race on `previous_hash`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use cyb_core::Timestamp;
use cyb_crypto::ChainSigner;
use cyb_storage::KvStore;
use cyb_telemetry::{TelemetryBus, TelemetryEvent};
use uuid::Uuid;

use crate::entry::{AuditEntry, EntryMetadata, ZERO_HASH};
use crate::error::{AuditError, AuditResult};
use crate::sanitize::sanitize;

const NAMESPACE: &str = "audit:entries";
const SEQ_NAMESPACE: &str = "audit:seq";

/// Event types that alert regardless of frequency.
const IMMEDIATE_ALERT_EVENTS: &[&str] = &["privilege_escalation", "sensitive_deletion"];

/// Event type whose alert fires only once it recurs within a window.
const AUTH_FAILURE_EVENT: &str = "auth_failure";
const AUTH_FAILURE_THRESHOLD: usize = 5;
const AUTH_FAILURE_WINDOW: Duration = Duration::from_secs(300);

fn seq_key(seq: u64) -> String {
    format!("{seq:020}")
}

struct ChainState {
    next_seq: u64,
    head_signature: String,
    /// Sliding windows of recent failures keyed by (event_type, actor),
    /// used to trigger threshold-based security alerts.
    failure_windows: HashMap<(String, String), VecDeque<Timestamp>>,
}

/// The append-only, hash-chained audit log (C3).
pub struct AuditLog {
    store: Arc<dyn KvStore>,
    signer: ChainSigner,
    telemetry: Arc<TelemetryBus>,
    node: String,
    state: tokio::sync::Mutex<ChainState>,
}

/// Outcome of [`AuditLog::verify_integrity`]. Mirrors the spec's
/// `{ok, ...}` / `{error, ...}` result shape as a single enum, since a
/// broken chain is an expected, reportable outcome rather than an I/O
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerification {
    /// Every entry's signature and link checked out.
    Ok {
        verified_entries: usize,
        chain_intact: bool,
    },
    /// Verification halted at the first broken entry.
    Invalid {
        reason: VerificationFailure,
        entry_id: Uuid,
    },
}

/// Why [`ChainVerification::Invalid`] was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The entry's signature does not match its recomputed HMAC.
    InvalidSignature,
    /// `previous_hash` does not equal the predecessor's signature.
    BrokenLink,
}

/// Result of [`AuditLog::rotate`].
#[derive(Debug, Clone)]
pub struct RotationRecord {
    pub archive_id: Uuid,
    pub archived_entries: usize,
    pub bridging_entry: Uuid,
}

impl AuditLog {
    /// Open the chain backed by `store`, creating a genesis entry if the
    /// namespace is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn open(
        store: Arc<dyn KvStore>,
        signer: ChainSigner,
        telemetry: Arc<TelemetryBus>,
        node: impl Into<String>,
    ) -> AuditResult<Self> {
        let node = node.into();
        let existing = store.scan_prefix(SEQ_NAMESPACE, "").await?;
        let (next_seq, head_signature) = if existing.is_empty() {
            (0u64, ZERO_HASH.to_string())
        } else {
            let mut keys: Vec<&str> = existing.iter().map(|e| e.key.as_str()).collect();
            keys.sort_unstable();
            let last_key = keys.last().expect("non-empty");
            let last_seq: u64 = last_key.parse().unwrap_or(0);
            let last_id_bytes = existing
                .iter()
                .find(|e| e.key == *last_key)
                .expect("key present")
                .value
                .clone();
            let last_id: Uuid = serde_json::from_slice(&last_id_bytes)?;
            let last_entry_bytes = store
                .get(NAMESPACE, &last_id.to_string())
                .await?
                .ok_or(AuditError::UnknownEntry(last_id))?;
            let last_entry: AuditEntry = serde_json::from_slice(&last_entry_bytes)?;
            (last_seq + 1, last_entry.signature)
        };

        let log = Self {
            store,
            signer,
            telemetry,
            node,
            state: tokio::sync::Mutex::new(ChainState {
                next_seq,
                head_signature,
                failure_windows: HashMap::new(),
            }),
        };

        if next_seq == 0 {
            log.append_locked(
                &mut log.state.lock().await,
                "genesis",
                "system",
                serde_json::json!({}),
                EntryMetadata::default(),
            )
            .await?;
        }

        Ok(log)
    }

    /// Build a memory-backed chain, for tests and ephemeral deployments.
    #[must_use]
    pub fn in_memory_blocking(signer: ChainSigner, telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            store: Arc::new(cyb_storage::MemoryKvStore::new()),
            signer,
            telemetry,
            node: "local".to_string(),
            state: tokio::sync::Mutex::new(ChainState {
                next_seq: 0,
                head_signature: ZERO_HASH.to_string(),
                failure_windows: HashMap::new(),
            }),
        }
    }

    /// Append a genesis entry to a freshly built in-memory chain. Callers
    /// that used [`Self::in_memory_blocking`] must call this once before
    /// appending further entries; [`Self::open`] does this automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or serialization fails.
    pub async fn seed_genesis(&self) -> AuditResult<()> {
        let mut state = self.state.lock().await;
        if state.next_seq == 0 {
            self.append_locked(&mut state, "genesis", "system", serde_json::json!({}), EntryMetadata::default())
                .await?;
        }
        Ok(())
    }

    /// The number of entries appended so far (including genesis), without
    /// walking the chain — used by the admin CLI and the health endpoint,
    /// which need a presence check cheaper than a full `verify_integrity`.
    pub async fn len(&self) -> u64 {
        self.state.lock().await.next_seq
    }

    /// Append a new entry, sanitizing `data` and chaining it off the
    /// current head.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or signer fails.
    pub async fn append(
        &self,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        data: serde_json::Value,
        metadata: EntryMetadata,
    ) -> AuditResult<Uuid> {
        let mut state = self.state.lock().await;
        self.append_locked(&mut state, event_type, actor, data, metadata).await
    }

    async fn append_locked(
        &self,
        state: &mut ChainState,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        data: serde_json::Value,
        mut metadata: EntryMetadata,
    ) -> AuditResult<Uuid> {
        let event_type = event_type.into();
        let actor = actor.into();
        if metadata.node.is_empty() {
            metadata.node = self.node.clone();
        }

        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            ts: Timestamp::now(),
            event_type: event_type.clone(),
            actor: actor.clone(),
            data: sanitize(data),
            metadata,
            previous_hash: state.head_signature.clone(),
            signature: String::new(),
        };
        let signing_bytes = entry.signing_bytes()?;
        entry.signature = self.signer.sign_hex(&signing_bytes);

        let bytes = serde_json::to_vec(&entry)?;
        self.store.set(NAMESPACE, &entry.id.to_string(), bytes).await?;
        self.store
            .set(SEQ_NAMESPACE, &seq_key(state.next_seq), serde_json::to_vec(&entry.id)?)
            .await?;

        state.next_seq += 1;
        state.head_signature.clone_from(&entry.signature);

        self.raise_security_alerts(state, &event_type, &actor, entry.id);

        Ok(entry.id)
    }

    fn raise_security_alerts(&self, state: &mut ChainState, event_type: &str, actor: &str, entry_id: Uuid) {
        if IMMEDIATE_ALERT_EVENTS.contains(&event_type) {
            self.publish_alert(event_type, actor, entry_id);
            return;
        }
        if event_type == AUTH_FAILURE_EVENT {
            let now = Timestamp::now();
            let window = state
                .failure_windows
                .entry((event_type.to_string(), actor.to_string()))
                .or_default();
            window.push_back(now);
            while let Some(front) = window.front() {
                if now.elapsed_since(*front).to_std().unwrap_or_default() > AUTH_FAILURE_WINDOW {
                    window.pop_front();
                } else {
                    break;
                }
            }
            if window.len() >= AUTH_FAILURE_THRESHOLD {
                self.publish_alert(event_type, actor, entry_id);
            }
        }
    }

    fn publish_alert(&self, event_type: &str, actor: &str, entry_id: Uuid) {
        self.telemetry.publish(
            &TelemetryEvent::new("cyb.audit.security_alert", "audit")
                .with_metadata("event_type", event_type)
                .with_metadata("actor", actor)
                .with_metadata("entry_id", entry_id.to_string()),
        );
    }

    async fn load_all_ordered(&self) -> AuditResult<Vec<AuditEntry>> {
        let mut seq_entries = self.store.scan_prefix(SEQ_NAMESPACE, "").await?;
        seq_entries.sort_by(|a, b| a.key.cmp(&b.key));

        let mut entries = Vec::with_capacity(seq_entries.len());
        for seq_entry in seq_entries {
            let id: Uuid = serde_json::from_slice(&seq_entry.value)?;
            let bytes = self
                .store
                .get(NAMESPACE, &id.to_string())
                .await?
                .ok_or(AuditError::UnknownEntry(id))?;
            entries.push(serde_json::from_slice(&bytes)?);
        }
        Ok(entries)
    }

    /// Re-derive every entry's signature in timestamp order, halting at the
    /// first signature mismatch or broken `previous_hash` link.
    ///
    /// `from`/`to` bound the window by entry id (inclusive); `None` means
    /// "from genesis" / "to the head".
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, or if `from`/`to` name
    /// an id not present in the chain.
    pub async fn verify_integrity(&self, from: Option<Uuid>, to: Option<Uuid>) -> AuditResult<ChainVerification> {
        let all = self.load_all_ordered().await?;

        let start = match from {
            Some(id) => all
                .iter()
                .position(|e| e.id == id)
                .ok_or(AuditError::UnknownEntry(id))?,
            None => 0,
        };
        let end = match to {
            Some(id) => all
                .iter()
                .position(|e| e.id == id)
                .ok_or(AuditError::UnknownEntry(id))?,
            None => all.len().saturating_sub(1),
        };

        let mut previous_signature: Option<String> = if start == 0 {
            None
        } else {
            Some(all[start - 1].signature.clone())
        };

        let mut verified = 0usize;
        for entry in &all[start..=end] {
            let expected_previous = previous_signature.clone().unwrap_or_else(|| ZERO_HASH.to_string());
            if entry.previous_hash != expected_previous {
                return Ok(ChainVerification::Invalid {
                    reason: VerificationFailure::BrokenLink,
                    entry_id: entry.id,
                });
            }
            let signing_bytes = entry.signing_bytes()?;
            let expected_sig_bytes = hex::decode(&entry.signature).unwrap_or_default();
            let valid = expected_sig_bytes.len() == 32
                && self
                    .signer
                    .verify(&signing_bytes, &expected_sig_bytes.try_into().expect("checked len"));
            if !valid {
                return Ok(ChainVerification::Invalid {
                    reason: VerificationFailure::InvalidSignature,
                    entry_id: entry.id,
                });
            }
            verified += 1;
            previous_signature = Some(entry.signature.clone());
        }

        Ok(ChainVerification::Ok {
            verified_entries: verified,
            chain_intact: true,
        })
    }

    /// Archive the current chain and start a fresh segment bridged to it:
    /// the bridging entry's `previous_hash` still points at the archived
    /// head, so `verify_integrity` over the archive plus the live segment
    /// remains one continuous chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or signer fails.
    pub async fn rotate(&self) -> AuditResult<RotationRecord> {
        let mut state = self.state.lock().await;
        let archive_id = Uuid::new_v4();
        let archived = self.load_all_ordered().await?;
        let archive_namespace = format!("audit:archive:{archive_id}");
        for (seq, entry) in archived.iter().enumerate() {
            let bytes = serde_json::to_vec(entry)?;
            self.store.set(&archive_namespace, &seq_key(seq as u64), bytes).await?;
        }

        for seq_entry in self.store.scan_prefix(SEQ_NAMESPACE, "").await? {
            self.store.delete(SEQ_NAMESPACE, &seq_entry.key).await?;
        }
        for entry in &archived {
            self.store.delete(NAMESPACE, &entry.id.to_string()).await?;
        }
        state.next_seq = 0;

        let bridging_entry = self
            .append_locked(
                &mut state,
                "chain_rotated",
                "system",
                serde_json::json!({"archive_id": archive_id.to_string(), "archived_entries": archived.len()}),
                EntryMetadata::default(),
            )
            .await?;

        Ok(RotationRecord {
            archive_id,
            archived_entries: archived.len(),
            bridging_entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn log() -> AuditLog {
        let log = AuditLog::in_memory_blocking(ChainSigner::new([9u8; 32]), Arc::new(TelemetryBus::new()));
        log.seed_genesis().await.unwrap();
        log
    }

    #[tokio::test]
    async fn genesis_plus_three_appends_verify_ok() {
        let log = log().await;
        log.append("auth_success", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();
        log.append("api_key_auth", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();
        log.append("auth_success", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();

        let result = log.verify_integrity(None, None).await.unwrap();
        assert_eq!(
            result,
            ChainVerification::Ok {
                verified_entries: 4,
                chain_intact: true,
            }
        );
    }

    #[tokio::test]
    async fn tampering_an_entry_breaks_verification_at_that_entry() {
        let log = log().await;
        log.append("auth_success", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();
        let second_id = log
            .append("api_key_auth", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();
        log.append("auth_success", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();

        let mut bytes = log.store.get(NAMESPACE, &second_id.to_string()).await.unwrap().unwrap();
        let mut entry: AuditEntry = serde_json::from_slice(&bytes).unwrap();
        entry.actor = "attacker".to_string();
        bytes = serde_json::to_vec(&entry).unwrap();
        log.store.set(NAMESPACE, &second_id.to_string(), bytes).await.unwrap();

        let result = log.verify_integrity(None, None).await.unwrap();
        assert_eq!(
            result,
            ChainVerification::Invalid {
                reason: VerificationFailure::InvalidSignature,
                entry_id: second_id,
            }
        );
    }

    #[tokio::test]
    async fn event_data_is_sanitized_before_signing() {
        let log = log().await;
        let id = log
            .append(
                "login",
                "alice",
                serde_json::json!({"password": "hunter2", "token": "abc"}),
                EntryMetadata::default(),
            )
            .await
            .unwrap();
        let bytes = log.store.get(NAMESPACE, &id.to_string()).await.unwrap().unwrap();
        let entry: AuditEntry = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entry.data, serde_json::json!({"token": "[REDACTED]"}));
    }

    #[tokio::test]
    async fn rotate_preserves_a_verifiable_bridging_link() {
        let log = log().await;
        log.append("auth_success", "alice", serde_json::json!({}), EntryMetadata::default())
            .await
            .unwrap();
        let record = log.rotate().await.unwrap();
        assert_eq!(record.archived_entries, 2);

        let result = log.verify_integrity(None, None).await.unwrap();
        assert_eq!(
            result,
            ChainVerification::Ok {
                verified_entries: 1,
                chain_intact: true,
            }
        );
    }

    #[tokio::test]
    async fn five_auth_failures_raise_a_security_alert() {
        let telemetry = Arc::new(TelemetryBus::new());
        let alerts = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&alerts);
        telemetry.register("test-counter", "cyb.audit.security_alert", move |_event| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        let log = AuditLog::in_memory_blocking(ChainSigner::new([1u8; 32]), telemetry);
        log.seed_genesis().await.unwrap();
        for _ in 0..5 {
            log.append("auth_failure", "bob", serde_json::json!({}), EntryMetadata::default())
                .await
                .unwrap();
        }

        assert_eq!(alerts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
