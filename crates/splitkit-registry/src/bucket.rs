//! Deterministic bucket hashing
//!
//! Maps a `(visitor, split)` pair onto `[0, 100)`. The value depends only on
//! its inputs, so it is identical across processes and over time.

use sha2::{Digest, Sha256};

/// Number of buckets; matches the full weight of a split
pub const BUCKET_COUNT: u64 = 100;

/// Bucket position of a visitor within a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket(u8);

impl Bucket {
    /// Compute bucket for `visitor_id` in `split_name`
    #[must_use]
    pub fn compute(visitor_id: &str, split_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(split_name.as_bytes());
        hasher.update(visitor_id.as_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let value = u64::from_be_bytes(prefix) % BUCKET_COUNT;

        // value < 100, always fits
        Self(u8::try_from(value).unwrap_or(u8::MAX))
    }

    /// Numeric value in `[0, 100)`
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0 as u32
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
