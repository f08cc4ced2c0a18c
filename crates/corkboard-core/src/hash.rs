//! Content hashing for image deduplication.
//!
//! Images are addressed by a BLAKE3 digest of their bytes. Very large payloads
//! may opt into a stride-sampled digest, which reads a fixed number of windows
//! instead of every byte.
//!
//! Sampled layout (`s1-` prefix): the hasher is seeded with the derive-key
//! context [`SAMPLED_HASH_CONTEXT`], fed the payload length as little-endian
//! `u64`, then `SAMPLE_COUNT` windows of `SAMPLE_WINDOW` bytes starting at
//! `i * (len / SAMPLE_COUNT)`, then the final `SAMPLE_WINDOW` bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derive-key context used to seed sampled digests.
pub const SAMPLED_HASH_CONTEXT: &str = "corkboard 2024 sampled image hash v1";
/// Number of windows read from a sampled payload.
pub const SAMPLE_COUNT: usize = 1024;
/// Bytes read per window.
pub const SAMPLE_WINDOW: usize = 256;
/// Default size above which sampling kicks in when enabled.
pub const DEFAULT_SAMPLE_THRESHOLD: usize = 8 * 1024 * 1024;

const SAMPLED_PREFIX: &str = "s1-";

/// Hex digest identifying image content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an existing digest string (e.g. one returned by the remote store).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this digest was produced by stride sampling.
    pub fn is_sampled(&self) -> bool {
        self.0.starts_with(SAMPLED_PREFIX)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How image bytes are digested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashStrategy {
    /// Every byte contributes; bit-exact dedup.
    #[default]
    Full,
    /// Payloads larger than `threshold` bytes are stride-sampled.
    Sampled { threshold: usize },
}

/// Computes content hashes according to a [`HashStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentHasher {
    strategy: HashStrategy,
}

impl ContentHasher {
    #[must_use]
    pub const fn new(strategy: HashStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub const fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    /// Digest image bytes.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        match self.strategy {
            HashStrategy::Sampled { threshold } if data.len() > threshold => sampled_hash(data),
            _ => full_hash(data),
        }
    }
}

fn full_hash(data: &[u8]) -> ContentHash {
    ContentHash(blake3::hash(data).to_hex().to_string())
}

fn sampled_hash(data: &[u8]) -> ContentHash {
    let len = data.len();
    let mut hasher = blake3::Hasher::new_derive_key(SAMPLED_HASH_CONTEXT);
    hasher.update(&(len as u64).to_le_bytes());

    let stride = len / SAMPLE_COUNT;
    for index in 0..SAMPLE_COUNT {
        let start = index * stride;
        let end = (start + SAMPLE_WINDOW).min(len);
        hasher.update(&data[start..end]);
    }
    hasher.update(&data[len.saturating_sub(SAMPLE_WINDOW)..]);

    ContentHash(format!("{SAMPLED_PREFIX}{}", hasher.finalize().to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|index| (index % 251) as u8).collect()
    }

    #[test]
    fn identical_bytes_hash_identically() {
        let hasher = ContentHasher::default();
        assert_eq!(hasher.hash(b"same bytes"), hasher.hash(b"same bytes"));
        assert_ne!(hasher.hash(b"same bytes"), hasher.hash(b"other bytes"));
    }

    #[test]
    fn full_hash_is_blake3_hex() {
        let hash = ContentHasher::default().hash(b"abc");
        assert_eq!(hash.as_str(), blake3::hash(b"abc").to_hex().as_str());
        assert_eq!(hash.as_str().len(), 64);
        assert!(!hash.is_sampled());
    }

    #[test]
    fn sampled_strategy_fully_hashes_small_payloads() {
        let sampled = ContentHasher::new(HashStrategy::Sampled { threshold: 1024 });
        let full = ContentHasher::default();
        let data = payload(1024);
        assert_eq!(sampled.hash(&data), full.hash(&data));
    }

    #[test]
    fn sampled_strategy_is_deterministic_above_threshold() {
        let sampled = ContentHasher::new(HashStrategy::Sampled { threshold: 1024 });
        let data = payload(512 * 1024);

        let first = sampled.hash(&data);
        assert!(first.is_sampled());
        assert_eq!(first, sampled.hash(&data));
        assert_ne!(first, ContentHasher::default().hash(&data));
    }

    #[test]
    fn sampled_strategy_sees_length_and_tail_changes() {
        let sampled = ContentHasher::new(HashStrategy::Sampled { threshold: 16 });
        let data = payload(300_000);

        let mut longer = data.clone();
        longer.push(0);
        assert_ne!(sampled.hash(&data), sampled.hash(&longer));

        let mut tail_changed = data.clone();
        let last = tail_changed.len() - 1;
        tail_changed[last] ^= 0xff;
        assert_ne!(sampled.hash(&data), sampled.hash(&tail_changed));
    }

    #[test]
    fn content_hash_serializes_as_plain_string() {
        let hash = ContentHash::new("abc123");
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"abc123\"");
    }
}
