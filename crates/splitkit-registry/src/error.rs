//! Error types for the split registry
//!
//! Covers:
//! - Resolution against splits the registry does not know
//! - Splits whose weights cannot be bucketed
//! - Registry payloads that fail to parse

/// Errors raised while reading or resolving against a registry snapshot
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Split is not part of the snapshot
    #[error("unknown split: {0}")]
    UnknownSplit(String),

    /// Split weights do not add up to a full bucket range
    #[error("split {split} has weights summing to {total}, expected 100")]
    InvalidWeights {
        /// Offending split
        split: String,
        /// Actual weight total
        total: u64,
    },

    /// Registry payload could not be decoded
    #[error("registry parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RegistryError {
    /// Create invalid weights error
    #[inline]
    #[must_use]
    pub fn invalid_weights(split: impl Into<String>, total: u64) -> Self {
        Self::InvalidWeights {
            split: split.into(),
            total,
        }
    }
}
