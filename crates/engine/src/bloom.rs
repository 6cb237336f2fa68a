use std::sync::atomic::{AtomicU64, Ordering};

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::trigram::Trigram;

/// Seed offset separating the secondary hash family from the primary one.
const SECONDARY_SEED_OFFSET: u64 = 0xA5A5_A5A5;

/// Feed-forward bloom filter pair.
///
/// The primary array answers set membership for every trigram ever added to
/// the index: zero false negatives, bounded false positives. The secondary
/// array records trigrams that positive queries actually touched, so it
/// converges on the hot subset of the key space. Bits are `AtomicU64` words
/// because queries teach the secondary while holding only the index read
/// lock; sets are idempotent, so relaxed ordering is enough.
pub struct DualBloom {
    primary: Box<[AtomicU64]>,
    secondary: Box<[AtomicU64]>,
    primary_bits: u64,
    secondary_bits: u64,
    hash_count: u32,
}

impl DualBloom {
    /// `primary_size` and `secondary_size` are in bytes.
    pub fn new(primary_size: usize, secondary_size: usize, hash_count: u32) -> Self {
        DualBloom {
            primary: zeroed_words(primary_size),
            secondary: zeroed_words(secondary_size),
            primary_bits: (primary_size as u64) * 8,
            secondary_bits: (secondary_size as u64) * 8,
            hash_count,
        }
    }

    /// Rebuild a filter from a primary-bit snapshot (database load). The
    /// secondary starts cold: query history is not persisted.
    pub fn from_primary_bytes(
        primary: &[u8],
        secondary_size: usize,
        hash_count: u32,
    ) -> Self {
        let mut words = Vec::with_capacity(primary.len().div_ceil(8));
        for chunk in primary.chunks(8) {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            words.push(AtomicU64::new(u64::from_le_bytes(buf)));
        }

        DualBloom {
            primary: words.into_boxed_slice(),
            secondary: zeroed_words(secondary_size),
            primary_bits: (primary.len() as u64) * 8,
            secondary_bits: (secondary_size as u64) * 8,
            hash_count,
        }
    }

    /// Snapshot of the primary bit array, little-endian words.
    pub fn primary_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.primary.len() * 8);
        for word in self.primary.iter() {
            out.extend_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
        }
        out
    }

    pub fn primary_size(&self) -> usize {
        (self.primary_bits / 8) as usize
    }

    pub fn secondary_size(&self) -> usize {
        (self.secondary_bits / 8) as usize
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Record `tri` in the primary filter.
    pub fn add(&self, tri: Trigram) {
        let key = tri.as_u32().to_le_bytes();
        for i in 0..self.hash_count {
            let bit = xxh3_64_with_seed(&key, i as u64) % self.primary_bits;
            set_bit(&self.primary, bit);
        }
    }

    /// Membership probe against the primary filter. A `false` is definite.
    pub fn check(&self, tri: Trigram) -> bool {
        let key = tri.as_u32().to_le_bytes();
        for i in 0..self.hash_count {
            let bit = xxh3_64_with_seed(&key, i as u64) % self.primary_bits;
            if !test_bit(&self.primary, bit) {
                return false;
            }
        }
        true
    }

    /// Record `tri` in the secondary (query-history) filter. Never touches
    /// the primary, so `check` results are unaffected.
    pub fn record_query(&self, tri: Trigram) {
        let key = tri.as_u32().to_le_bytes();
        for i in 0..self.hash_count {
            let seed = SECONDARY_SEED_OFFSET + i as u64;
            let bit = xxh3_64_with_seed(&key, seed) % self.secondary_bits;
            set_bit(&self.secondary, bit);
        }
    }

    /// Feed-forward probe: the primary verdict, and on a positive only,
    /// the trigram is recorded into the secondary. This is how the query
    /// pipeline teaches the secondary which trigrams are actually hit.
    pub fn check_and_record(&self, tri: Trigram) -> bool {
        let hit = self.check(tri);
        if hit {
            self.record_query(tri);
        }
        hit
    }

    /// The subset of `patterns` whose secondary bits are all set: trigrams
    /// that were indexed at some point and touched by recent queries.
    pub fn get_candidates(&self, patterns: &[Trigram]) -> Vec<Trigram> {
        patterns
            .iter()
            .copied()
            .filter(|&tri| self.in_secondary(tri))
            .collect()
    }

    fn in_secondary(&self, tri: Trigram) -> bool {
        let key = tri.as_u32().to_le_bytes();
        for i in 0..self.hash_count {
            let seed = SECONDARY_SEED_OFFSET + i as u64;
            let bit = xxh3_64_with_seed(&key, seed) % self.secondary_bits;
            if !test_bit(&self.secondary, bit) {
                return false;
            }
        }
        true
    }
}

fn zeroed_words(size_bytes: usize) -> Box<[AtomicU64]> {
    let words = size_bytes.div_ceil(8);
    let mut v = Vec::with_capacity(words);
    v.resize_with(words, || AtomicU64::new(0));
    v.into_boxed_slice()
}

#[inline]
fn set_bit(words: &[AtomicU64], bit: u64) {
    let word = (bit / 64) as usize;
    let mask = 1u64 << (bit % 64);
    words[word].fetch_or(mask, Ordering::Relaxed);
}

#[inline]
fn test_bit(words: &[AtomicU64], bit: u64) -> bool {
    let word = (bit / 64) as usize;
    let mask = 1u64 << (bit % 64);
    words[word].load(Ordering::Relaxed) & mask != 0
}

#[cfg(test)]
#[path = "bloom_tests.rs"]
mod tests;
