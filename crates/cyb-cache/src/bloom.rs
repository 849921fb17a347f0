//! Bloom filter membership test backing [`crate::cache::DeterministicCache::probably_exists`].
//!
//! Uses double hashing (`h(i) = h1 + i * h2`) over two `SipHash-1-3`
//! instances keyed differently, rather than computing `k` independent
//! hashes, per spec §4.7: m≈10^6 bits, 7 bit positions per insert.

use bitvec::prelude::*;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Default bit-array size (spec: m≈10^6).
pub const DEFAULT_M_BITS: usize = 1_000_000;

/// Default number of hash positions set per insert (spec: 7).
pub const DEFAULT_K: usize = 7;

/// Probabilistic membership set. Never false-negative: if `key` was
/// inserted, `might_contain(key)` always returns `true`.
#[derive(Clone)]
pub struct BloomFilter {
    bits: BitVec<u8, Lsb0>,
    k: usize,
    m: usize,
    inserted: usize,
}

impl BloomFilter {
    #[must_use]
    pub fn new(m_bits: usize, k: usize) -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; m_bits],
            k,
            m: m_bits,
            inserted: 0,
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_M_BITS, DEFAULT_K)
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = usize> + '_ {
        let h1 = Self::hash_with_key(key, 0x5151_6767_8989_2323);
        let h2 = Self::hash_with_key(key, 0x1357_9bdf_2468_ace0);
        (0..self.k).map(move |i| (h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.m as u64) as usize)
    }

    fn hash_with_key(data: &[u8], key: u64) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(key, key.rotate_left(32));
        hasher.write(data);
        hasher.finish()
    }

    /// Set this key's `k` bit positions.
    pub fn insert(&mut self, key: &[u8]) {
        let positions: Vec<usize> = self.positions(key).collect();
        for pos in positions {
            self.bits.set(pos, true);
        }
        self.inserted += 1;
    }

    /// Whether `key` might be a member. `false` is authoritative (never
    /// inserted); `true` may be a false positive.
    #[must_use]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.positions(key).all(|pos| self.bits[pos])
    }

    /// Analytic false-positive rate at the current insertion count:
    /// `(1 - e^(-kn/m))^k`.
    #[must_use]
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let exponent = -(self.k as f64) * (self.inserted as f64) / (self.m as f64);
        (1.0 - exponent.exp()).powi(self.k as i32)
    }

    #[must_use]
    pub fn inserted_count(&self) -> usize {
        self.inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_key_is_always_found() {
        let mut filter = BloomFilter::with_defaults();
        filter.insert(b"hello");
        assert!(filter.might_contain(b"hello"));
    }

    #[test]
    fn never_inserted_key_is_usually_absent() {
        let filter = BloomFilter::with_defaults();
        assert!(!filter.might_contain(b"never inserted"));
    }

    #[test]
    fn false_positive_rate_grows_with_insertions_and_stays_bounded() {
        let mut filter = BloomFilter::with_defaults();
        for i in 0..100_000u32 {
            filter.insert(&i.to_le_bytes());
        }
        let fpr = filter.estimated_false_positive_rate();
        assert!(fpr > 0.0);
        assert!(fpr <= 0.02, "fpr {fpr} exceeded the 2% bound at 1e5 inserts");
    }

    #[test]
    fn distinct_keys_usually_produce_distinct_position_sets() {
        let filter = BloomFilter::new(DEFAULT_M_BITS, DEFAULT_K);
        let a: Vec<usize> = filter.positions(b"a").collect();
        let b: Vec<usize> = filter.positions(b"b").collect();
        assert_ne!(a, b);
    }
}
