//! Split registry snapshots
//!
//! Provides [`SplitRegistry`], an immutable mapping of split name to variant
//! weights, and [`RegistryHandle`], the process-wide holder that swaps whole
//! snapshots in and out.
//!
//! An absent registry (`None`) is a distinct state from an empty one: empty
//! means no splits exist, absent means the registry has not been loaded.

use crate::error::RegistryError;
use crate::split::Split;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Wire representation: split name → variant name → weight
pub type RegistryPayload = BTreeMap<String, IndexMap<String, u32>>;

/// Immutable snapshot of every known split
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "RegistryPayload", into = "RegistryPayload")]
pub struct SplitRegistry {
    splits: BTreeMap<String, Split>,
}

impl SplitRegistry {
    /// Create empty registry (no splits exist)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a split while building a snapshot
    #[must_use]
    pub fn with_split(mut self, split: Split) -> Self {
        self.splits.insert(split.name().to_string(), split);
        self
    }

    /// Decode a registry payload
    ///
    /// A JSON `null` decodes to an absent registry.
    ///
    /// # Errors
    /// `RegistryError::Parse` if the payload is malformed
    pub fn from_json(json: &str) -> Result<Option<Self>, RegistryError> {
        let payload: Option<RegistryPayload> = serde_json::from_str(json)?;
        Ok(payload.map(Self::from))
    }

    /// Look up a split
    #[inline]
    #[must_use]
    pub fn split(&self, name: &str) -> Option<&Split> {
        self.splits.get(name)
    }

    /// Variant weights for a split, if it exists
    #[inline]
    #[must_use]
    pub fn variants_for(&self, name: &str) -> Option<&IndexMap<String, u32>> {
        self.splits.get(name).map(Split::variants)
    }

    /// Whether the split is part of this snapshot
    #[inline]
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.splits.contains_key(name)
    }

    /// Split names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.splits.keys().map(String::as_str)
    }

    /// Number of splits
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    /// Check if no splits exist
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

impl From<RegistryPayload> for SplitRegistry {
    fn from(payload: RegistryPayload) -> Self {
        let splits = payload
            .into_iter()
            .map(|(name, variants)| {
                let split = Split::new(name.clone(), variants);
                (name, split)
            })
            .collect();
        Self { splits }
    }
}

impl From<SplitRegistry> for RegistryPayload {
    fn from(registry: SplitRegistry) -> Self {
        registry
            .splits
            .into_iter()
            .map(|(name, split)| (name, split.into_variants()))
            .collect()
    }
}

/// Producer of registry snapshots (e.g. a remote fetch)
pub trait RegistrySource: Send + Sync {
    /// Fetch a full snapshot
    ///
    /// `Ok(None)` means the registry is unavailable, not that it is empty.
    ///
    /// # Errors
    /// Transport failures, passed through unchanged
    fn fetch(&self) -> anyhow::Result<Option<SplitRegistry>>;
}

/// Process-wide holder of the current registry snapshot
///
/// Snapshots are swapped as a unit, so a reader holding an `Arc` never sees a
/// partially updated registry. Reads only contend with the pointer swap.
#[derive(Debug, Default)]
pub struct RegistryHandle {
    current: RwLock<Option<Arc<SplitRegistry>>>,
}

impl RegistryHandle {
    /// Create handle with no registry loaded
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create handle holding an initial snapshot
    #[must_use]
    pub fn with_registry(registry: SplitRegistry) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(registry))),
        }
    }

    /// Current snapshot, or `None` if absent
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<SplitRegistry>> {
        self.current.read().clone()
    }

    /// Whether a snapshot is loaded
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Swap in a new snapshot
    pub fn replace(&self, registry: SplitRegistry) {
        let splits = registry.len();
        *self.current.write() = Some(Arc::new(registry));
        tracing::info!(splits, "split registry replaced");
    }

    /// Drop the current snapshot
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// Fetch from `source` and swap the result in
    ///
    /// An unavailable registry leaves the current snapshot in place.
    ///
    /// # Errors
    /// Whatever the source returns; the current snapshot is untouched
    pub fn refresh(&self, source: &dyn RegistrySource) -> anyhow::Result<bool> {
        match source.fetch()? {
            Some(registry) => {
                self.replace(registry);
                Ok(true)
            }
            None => {
                tracing::warn!("registry source returned no snapshot; keeping current");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SplitRegistry {
        SplitRegistry::new()
            .with_split(Split::new(
                "button_size",
                [("one", 100), ("two", 0), ("three", 0), ("four", 0)],
            ))
            .with_split(Split::new(
                "time",
                [("hammertime", 50), ("clobberin_time", 50)],
            ))
    }

    struct FixedSource(Option<SplitRegistry>);

    impl RegistrySource for FixedSource {
        fn fetch(&self) -> anyhow::Result<Option<SplitRegistry>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl RegistrySource for FailingSource {
        fn fetch(&self) -> anyhow::Result<Option<SplitRegistry>> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn registry_lookup() {
        let registry = registry();
        assert!(registry.exists("time"));
        assert!(!registry.exists("not_a_real_split"));
        assert_eq!(registry.variants_for("time").map(IndexMap::len), Some(2));
        assert!(registry.variants_for("nope").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn from_json_present() {
        let registry = SplitRegistry::from_json(r#"{"blue_button":{"true":0,"false":100}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            registry.split("blue_button").and_then(|s| s.weight("false")),
            Some(100)
        );
    }

    #[test]
    fn from_json_null_is_absent() {
        assert!(SplitRegistry::from_json("null").unwrap().is_none());
    }

    #[test]
    fn from_json_empty_is_present() {
        let registry = SplitRegistry::from_json("{}").unwrap();
        assert!(registry.is_some_and(|r| r.is_empty()));
    }

    #[test]
    fn from_json_malformed() {
        let err = SplitRegistry::from_json(r#"{"a": 3}"#).unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
    }

    #[test]
    fn serde_round_trip_keeps_payload_shape() {
        let json = serde_json::to_value(registry()).unwrap();
        assert_eq!(json["time"]["hammertime"], 50);
    }

    #[test]
    fn handle_replace_and_clear() {
        let handle = RegistryHandle::new();
        assert!(handle.snapshot().is_none());

        handle.replace(registry());
        let before = handle.snapshot().unwrap();
        assert!(handle.is_loaded());

        handle.replace(SplitRegistry::new());
        // Old snapshot stays intact for whoever holds it
        assert_eq!(before.len(), 2);
        assert!(handle.snapshot().unwrap().is_empty());

        handle.clear();
        assert!(!handle.is_loaded());
    }

    #[test]
    fn handle_refresh() {
        let handle = RegistryHandle::new();
        assert!(handle.refresh(&FixedSource(Some(registry()))).unwrap());
        assert_eq!(handle.snapshot().unwrap().len(), 2);

        assert!(!handle.refresh(&FixedSource(None)).unwrap());
        assert_eq!(handle.snapshot().unwrap().len(), 2);
    }

    #[test]
    fn handle_refresh_propagates_failure() {
        let handle = RegistryHandle::with_registry(registry());
        let err = handle.refresh(&FailingSource).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert!(handle.is_loaded());
    }
}
