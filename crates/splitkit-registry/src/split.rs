//! Split definitions
//!
//! A [`Split`] is a named experiment or feature flag with a weighted set of
//! variants. Variants keep the order the registry declared them in; the
//! resolver walks them in ascending name order so that resolution does not
//! depend on payload ordering.

use crate::error::RegistryError;
use indexmap::IndexMap;

/// Total weight of an active split
pub const FULL_WEIGHT: u32 = 100;

/// A named split with its variant weights
///
/// Immutable once part of a registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    name: String,
    variants: IndexMap<String, u32>,
}

impl Split {
    /// Create a split from `(variant, weight)` pairs
    #[must_use]
    pub fn new<I, V>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = (V, u32)>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(|(v, w)| (v.into(), w)).collect(),
        }
    }

    /// Split name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant weights in declared order
    #[inline]
    #[must_use]
    pub fn variants(&self) -> &IndexMap<String, u32> {
        &self.variants
    }

    /// Variant names in declared order
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }

    /// Variants sorted by name, the order buckets are laid out in
    #[must_use]
    pub fn resolution_order(&self) -> Vec<(&str, u32)> {
        let mut ordered: Vec<(&str, u32)> = self
            .variants
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
            .collect();
        ordered.sort_unstable_by(|a, b| a.0.cmp(b.0));
        ordered
    }

    /// Whether `variant` is a legal variant of this split
    #[inline]
    #[must_use]
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.contains_key(variant)
    }

    /// Weight of a variant, if declared
    #[inline]
    #[must_use]
    pub fn weight(&self, variant: &str) -> Option<u32> {
        self.variants.get(variant).copied()
    }

    /// Number of variants
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the split declares no variants
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Sum of all weights
    ///
    /// Widened so that wire weights near `u32::MAX` cannot overflow.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.variants.values().map(|&weight| u64::from(weight)).sum()
    }

    /// Check that the weights cover exactly the full bucket range
    ///
    /// # Errors
    /// `RegistryError::InvalidWeights` when the sum is not 100
    pub fn validate(&self) -> Result<(), RegistryError> {
        let total = self.total_weight();
        if total == u64::from(FULL_WEIGHT) {
            Ok(())
        } else {
            Err(RegistryError::invalid_weights(&self.name, total))
        }
    }

    /// A single variant holding the full weight (feature effectively off)
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.variants.len() == 1 && self.total_weight() == u64::from(FULL_WEIGHT)
    }

    pub(crate) fn into_variants(self) -> IndexMap<String, u32> {
        self.variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_keep_declared_order() {
        let split = Split::new(
            "button_size",
            [("one", 100), ("two", 0), ("three", 0), ("four", 0)],
        );
        let names: Vec<_> = split.variant_names().collect();
        assert_eq!(names, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn resolution_order_is_by_name() {
        let split = Split::new("side_dish", [("soup", 0), ("salad", 100)]);
        assert_eq!(split.resolution_order(), vec![("salad", 100), ("soup", 0)]);
    }

    #[test]
    fn validate_accepts_full_weight() {
        let split = Split::new("time", [("hammertime", 50), ("clobberin_time", 50)]);
        assert!(split.validate().is_ok());
    }

    #[test]
    fn validate_rejects_partial_weight() {
        let split = Split::new("time", [("hammertime", 50), ("clobberin_time", 40)]);
        let err = split.validate().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidWeights { total: 90, .. }
        ));
    }

    #[test]
    fn validate_rejects_weights_past_u32() {
        let split = Split::new("s", [("a", u32::MAX), ("b", 101)]);
        let err = split.validate().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidWeights { total, .. } if total == u64::from(u32::MAX) + 101
        ));
    }

    #[test]
    fn degenerate_split() {
        assert!(Split::new("off", [("false", 100)]).is_degenerate());
        assert!(!Split::new("on", [("true", 50), ("false", 50)]).is_degenerate());
    }

    #[test]
    fn has_variant_and_weight() {
        let split = Split::new("blue_button", [("true", 0), ("false", 100)]);
        assert!(split.has_variant("true"));
        assert!(!split.has_variant("maybe"));
        assert_eq!(split.weight("false"), Some(100));
        assert_eq!(split.len(), 2);
    }
}
