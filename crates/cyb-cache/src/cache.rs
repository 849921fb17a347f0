//! C7: content-addressed cache. `put` keys entries by the SHA-256 of their
//! content (spec §8 scenario S2's literal digest for `"hello"`), so equal
//! bytes always produce the same key and a duplicate `put` is a no-op.
//!
//! Eviction runs first by entry-count ceiling, then by byte-size ceiling,
//! both LRU-ordered; expired entries are also dropped lazily on access and
//! by a periodic sweep.

use cyb_core::Timestamp;
use cyb_crypto::ContentHash;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use cyb_telemetry::{TelemetryBus, TelemetryEvent};

use crate::bloom::BloomFilter;
use crate::error::{CacheError, CacheResult};

/// A single stored record.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: ContentHash,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub size: usize,
    pub created_at: Timestamp,
    pub accessed_at: Timestamp,
    pub ttl: Option<Duration>,
    pub hit_count: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Timestamp) -> bool {
        match self.ttl {
            Some(ttl) => now.elapsed_since(self.created_at).num_milliseconds() >= ttl.as_millis() as i64,
            None => false,
        }
    }
}

/// Eviction ceilings.
#[derive(Debug, Clone, Copy)]
pub struct CacheLimits {
    pub max_entries: usize,
    pub max_bytes: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Hit-rate / membership-accuracy counters, exposed for the admin CLI and
/// `/metrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    entries: HashMap<ContentHash, CacheEntry>,
    lru: VecDeque<ContentHash>,
    bloom: BloomFilter,
    total_bytes: usize,
    limits: CacheLimits,
    stats: CacheStats,
}

impl Inner {
    fn touch_lru(&mut self, key: ContentHash) {
        self.lru.retain(|k| *k != key);
        self.lru.push_back(key);
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.limits.max_entries {
            self.evict_oldest();
        }
        while self.total_bytes > self.limits.max_bytes {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let Some(oldest) = self.lru.pop_front() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&oldest) {
            self.total_bytes -= entry.size;
            self.stats.evictions += 1;
        }
        true
    }

    fn remove_expired_entry(&mut self, key: &ContentHash) {
        if let Some(entry) = self.entries.remove(key) {
            self.total_bytes -= entry.size;
        }
        self.lru.retain(|k| k != key);
    }
}

/// Owns the cache's entries, LRU order, and Bloom filter behind a single
/// lock, matching the "owned by a single actor" discipline spec §5
/// prescribes for shared mutable state.
pub struct DeterministicCache {
    inner: parking_lot::Mutex<Inner>,
    telemetry: Arc<TelemetryBus>,
}

impl DeterministicCache {
    #[must_use]
    pub fn new(limits: CacheLimits, telemetry: Arc<TelemetryBus>) -> Self {
        Self {
            inner: parking_lot::Mutex::new(Inner {
                entries: HashMap::new(),
                lru: VecDeque::new(),
                bloom: BloomFilter::with_defaults(),
                total_bytes: 0,
                limits,
                stats: CacheStats::default(),
            }),
            telemetry,
        }
    }

    /// Store `content`, returning its content-hash key. A second `put` of
    /// identical bytes returns the same key without creating a new LRU
    /// entry (spec §8 scenario S2).
    pub fn put(&self, content: &[u8], ttl: Option<Duration>, content_type: impl Into<String>) -> ContentHash {
        let key = ContentHash::hash(content);
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&key) {
            return key;
        }

        let now = Timestamp::now();
        let entry = CacheEntry {
            key,
            bytes: content.to_vec(),
            content_type: content_type.into(),
            size: content.len(),
            created_at: now,
            accessed_at: now,
            ttl,
            hit_count: 0,
        };
        inner.total_bytes += entry.size;
        inner.entries.insert(key, entry);
        inner.lru.push_back(key);
        inner.bloom.insert(key.as_ref());
        inner.stats.puts += 1;
        inner.evict_if_needed();
        key
    }

    /// Authoritative lookup. Removes and reports a miss for an expired
    /// entry rather than returning stale bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if there is no live entry for
    /// `key`.
    pub fn get(&self, key: &ContentHash) -> CacheResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let now = Timestamp::now();

        if let Some(entry) = inner.entries.get(key) {
            if entry.is_expired(now) {
                inner.remove_expired_entry(key);
                inner.stats.misses += 1;
                return Err(CacheError::NotFound);
            }
            let bytes = entry.bytes.clone();
            inner.stats.hits += 1;
            if let Some(entry) = inner.entries.get_mut(key) {
                entry.accessed_at = now;
                entry.hit_count += 1;
            }
            inner.touch_lru(*key);
            Ok(bytes)
        } else {
            inner.stats.misses += 1;
            Err(CacheError::NotFound)
        }
    }

    /// Probabilistic membership test, consulting only the Bloom filter.
    #[must_use]
    pub fn probably_exists(&self, key: &ContentHash) -> bool {
        self.inner.lock().bloom.might_contain(key.as_ref())
    }

    /// Remove every entry whose TTL has elapsed. Intended to be driven by
    /// a periodic (5-minute, per spec) sweep task.
    pub fn sweep_expired(&self) {
        let now = Timestamp::now();
        let mut inner = self.inner.lock();
        let expired: Vec<ContentHash> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| *k)
            .collect();
        let count = expired.len();
        for key in expired {
            inner.remove_expired_entry(&key);
        }
        drop(inner);
        if count > 0 {
            self.telemetry.publish(
                &TelemetryEvent::new("cyb.cache.sweep", "cache").with_measurement("expired", count as f64),
            );
        }
    }

    /// Spawn a background task that sweeps expired entries every
    /// `interval` (default 5 minutes per spec §4.7) until the returned
    /// handle is dropped or aborted.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                cache.sweep_expired();
            }
        })
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    #[must_use]
    pub fn false_positive_rate(&self) -> f64 {
        self.inner.lock().bloom.estimated_false_positive_rate()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> DeterministicCache {
        DeterministicCache::new(CacheLimits::default(), Arc::new(TelemetryBus::new()))
    }

    #[test]
    fn hello_hashes_to_the_documented_key() {
        let cache = cache();
        let key = cache.put(b"hello", None, "text/plain");
        assert_eq!(
            key.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn get_returns_exactly_the_put_content() {
        let cache = cache();
        let key = cache.put(b"hello", None, "text/plain");
        assert_eq!(cache.get(&key).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn duplicate_put_is_a_noop_on_lru_and_returns_same_key() {
        let cache = cache();
        let k1 = cache.put(b"hello", None, "text/plain");
        let k2 = cache.put(b"hello", None, "text/plain");
        assert_eq!(k1, k2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().puts, 1);
    }

    #[test]
    fn probably_exists_is_true_whenever_get_would_succeed() {
        let cache = cache();
        let key = cache.put(b"payload", None, "text/plain");
        assert!(cache.probably_exists(&key));
        assert!(cache.get(&key).is_ok());
    }

    #[test]
    fn missing_key_is_not_found() {
        let cache = cache();
        let key = ContentHash::hash(b"never stored");
        assert_eq!(cache.get(&key), Err(CacheError::NotFound));
    }

    #[test]
    fn expired_entry_is_evicted_on_access() {
        let cache = cache();
        let key = cache.put(b"short lived", Some(Duration::from_millis(0)), "text/plain");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&key), Err(CacheError::NotFound));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn evicts_by_entry_count_ceiling_lru_first() {
        let cache = DeterministicCache::new(
            CacheLimits {
                max_entries: 2,
                max_bytes: usize::MAX,
            },
            Arc::new(TelemetryBus::new()),
        );
        let a = cache.put(b"a", None, "text/plain");
        let _b = cache.put(b"b", None, "text/plain");
        let _c = cache.put(b"c", None, "text/plain");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&a), Err(CacheError::NotFound));
    }

    #[test]
    fn sweep_expired_removes_only_expired_entries() {
        let cache = cache();
        let expired = cache.put(b"expired", Some(Duration::from_millis(0)), "text/plain");
        let fresh = cache.put(b"fresh", None, "text/plain");
        std::thread::sleep(Duration::from_millis(5));

        cache.sweep_expired();

        assert!(cache.probably_exists(&expired));
        assert!(cache.get(&expired).is_err());
        assert!(cache.get(&fresh).is_ok());
    }
}
