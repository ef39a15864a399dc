// File: src/filter/bloom.rs
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Approximate set membership for index keys.
///
/// - False positives: possible (costs one wasted index probe)
/// - False negatives: never
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_count: usize,
    hash_count: usize,
}

impl BloomFilter {
    /// Sized at `bits_per_key` bits per expected key; 10 bits with 3 hashes
    /// gives roughly a 1% false positive rate.
    pub fn new(expected_keys: usize, bits_per_key: usize, hash_count: usize) -> Self {
        let wanted = expected_keys.max(1) * bits_per_key.max(1);
        let chunk_count = (wanted + 63) / 64;
        Self { bits: vec![0u64; chunk_count], bit_count: chunk_count * 64, hash_count: hash_count.max(1) }
    }

    pub fn add(&mut self, key: &str) {
        for seed in 0..self.hash_count {
            let bit = self.bit_index(key, seed as u64);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    #[inline]
    pub fn might_contain(&self, key: &str) -> bool {
        (0..self.hash_count).all(|seed| {
            let bit = self.bit_index(key, seed as u64);
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    #[inline]
    fn bit_index(&self, key: &str, seed: u64) -> usize {
        let mut hasher = FxHasher::default();
        seed.hash(&mut hasher);
        key.as_bytes().hash(&mut hasher);
        (hasher.finish() % self.bit_count as u64) as usize
    }
}
