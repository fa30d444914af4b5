//! Weighted variant resolution
//!
//! [`AssignmentResolver`] is stateless: it reads only its arguments and can be
//! called from any number of threads at once.

use crate::bucket::Bucket;
use crate::error::RegistryError;
use crate::registry::SplitRegistry;

/// Resolves the variant a visitor sees for a split
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentResolver;

impl AssignmentResolver {
    /// Create resolver
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve the variant for `visitor_id` in `split_name`
    ///
    /// Returns `Ok(None)` when the registry is absent; the caller's default
    /// branch has to supply a variant in that case.
    ///
    /// # Errors
    /// - `RegistryError::UnknownSplit` if the split is not in the registry
    /// - `RegistryError::InvalidWeights` if its weights do not sum to 100
    pub fn resolve(
        &self,
        visitor_id: &str,
        split_name: &str,
        registry: Option<&SplitRegistry>,
    ) -> Result<Option<String>, RegistryError> {
        let Some(registry) = registry else {
            return Ok(None);
        };

        let split = registry
            .split(split_name)
            .ok_or_else(|| RegistryError::UnknownSplit(split_name.to_string()))?;
        split.validate()?;

        let bucket = Bucket::compute(visitor_id, split_name);
        let mut upper: u64 = 0;
        for (variant, weight) in split.resolution_order() {
            upper += u64::from(weight);
            if upper > u64::from(bucket.value()) {
                tracing::debug!(
                    split = split_name,
                    visitor_id,
                    variant,
                    %bucket,
                    "resolved variant"
                );
                return Ok(Some(variant.to_string()));
            }
        }

        // Weights sum to 100 and bucket < 100, so the walk above always returns
        Err(RegistryError::invalid_weights(split_name, upper))
    }
}
