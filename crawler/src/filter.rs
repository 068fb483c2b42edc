//! Approximate membership filters for crawl deduplication.
//!
//! A conventional bloom filter over node keys: `contains` returning false
//! proves the key was never inserted, while true may be a false positive at
//! the configured rate. There are no deletions, which is exactly the contract
//! the crawl filters need since a key's fate never changes within a run.

use bitvec::prelude::*;
use log::warn;
use mesh_peers_client::NodeKey;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;
use std::io::Cursor;
use std::path::Path;

/// A space-bounded approximate set of node keys.
///
/// Sized at construction for an expected capacity and target false-positive
/// rate; both stay fixed for the filter's lifetime. State can be snapshotted
/// to disk so membership survives process restarts, which keeps a crawler
/// from re-querying known non-members across runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembershipFilter {
    /// Bit array holding the filter state.
    #[serde(with = "bits_serde")]
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions.
    hashes: usize,
}

/// Serde support for BitVec.
mod bits_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes: Vec<u8> = bits.as_raw_slice().to_vec();
        (bytes, bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl MembershipFilter {
    /// Build a filter sized for `capacity` keys at `false_positive_rate`.
    ///
    /// Uses the optimal bloom parameters `m = -n·ln p / ln²2` and
    /// `k = (m/n)·ln 2`. The rate is clamped into (0, 1) and the capacity to
    /// at least one element; call sites taking user input should validate
    /// instead of relying on the clamp.
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        let capacity = capacity.max(1);
        let rate = false_positive_rate.clamp(1e-9, 0.999);
        let bits = optimal_bits(capacity, rate);
        let hashes = optimal_hashes(bits, capacity);
        MembershipFilter {
            bits: bitvec![u8, Lsb0; 0; bits],
            hashes,
        }
    }

    /// Load a snapshot from `path`, or build a fresh filter when the file is
    /// absent or does not decode.
    pub fn load_or_new(path: &Path, capacity: usize, false_positive_rate: f64) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match bincode::deserialize(&bytes) {
                Ok(filter) => filter,
                Err(e) => {
                    warn!(
                        "Discarding unreadable filter snapshot {}: {e}",
                        path.display()
                    );
                    Self::new(capacity, false_positive_rate)
                }
            },
            Err(_) => Self::new(capacity, false_positive_rate),
        }
    }

    /// Write a snapshot of the filter state to `path`.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, bytes)
    }

    /// Add a key to the set. Idempotent, re-inserting is a no-op.
    pub fn insert(&mut self, key: &NodeKey) {
        for position in self.positions(key) {
            self.bits.set(position, true);
        }
    }

    /// Approximate membership test.
    ///
    /// `false` means the key was definitely never inserted; `true` means it
    /// probably was, wrong at most at the configured false-positive rate.
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.positions(key).into_iter().all(|position| self.bits[position])
    }

    /// Bit positions for a key via double hashing: `g_i = h1 + i·h2 (mod m)`.
    fn positions(&self, key: &NodeKey) -> Vec<usize> {
        let h1 = murmur(key.as_str().as_bytes(), 0);
        let h2 = murmur(key.as_str().as_bytes(), 1);
        let len = self.bits.len() as u64;
        (0..self.hashes)
            .map(|i| (h1.wrapping_add((i as u64).wrapping_mul(h2)) % len) as usize)
            .collect()
    }
}

/// MurmurHash3 x64 128, truncated to the lower 64 bits.
fn murmur(bytes: &[u8], seed: u32) -> u64 {
    murmur3::murmur3_x64_128(&mut Cursor::new(bytes), seed).unwrap_or(0) as u64
}

/// Optimal bit count: `m = -n·ln p / ln²2`.
fn optimal_bits(capacity: usize, false_positive_rate: f64) -> usize {
    let bits = -(capacity as f64) * false_positive_rate.ln() / (LN_2 * LN_2);
    (bits.ceil() as usize).max(8)
}

/// Optimal hash count: `k = (m/n)·ln 2`.
fn optimal_hashes(bits: usize, capacity: usize) -> usize {
    let hashes = (bits as f64 / capacity as f64) * LN_2;
    (hashes.round() as usize).clamp(1, 30)
}
