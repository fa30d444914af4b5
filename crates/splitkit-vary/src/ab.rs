//! Boolean A/B on top of [`VaryDsl`]

use crate::dsl::{VaryDsl, VaryOutcome};
use crate::error::{ConfigError, VaryError};
use crate::notifier::MisconfigurationNotifier;
use splitkit_registry::{Assignment, SplitRegistry};

/// Variant used as `true` when none is given
pub const DEFAULT_TRUE_VARIANT: &str = "true";

const FALLBACK_FALSE_VARIANT: &str = "false";

/// Which variants of a split mean `true` and `false`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbConfiguration {
    split_name: String,
    true_variant: String,
    false_variant: String,
}

impl AbConfiguration {
    /// Work out the true/false variants for `split_name`
    ///
    /// The false variant is the first other variant by name, or `"false"`
    /// when the registry offers none.
    ///
    /// # Errors
    /// - `ConfigError::UnknownSplit` if a loaded registry lacks the split
    /// - `VaryError::Misconfigured` if the notifier raises on a split with
    ///   more than two variants
    pub fn new(
        split_name: impl Into<String>,
        true_variant: Option<&str>,
        registry: Option<&SplitRegistry>,
        notifier: &dyn MisconfigurationNotifier,
    ) -> Result<Self, VaryError> {
        let split_name = split_name.into();
        let true_variant = true_variant.unwrap_or(DEFAULT_TRUE_VARIANT).to_string();

        let mut false_variant = None;
        if let Some(registry) = registry {
            let split = registry
                .split(&split_name)
                .ok_or_else(|| ConfigError::UnknownSplit(split_name.clone()))?;
            if split.len() > 2 {
                notifier.notify(&format!(
                    "A/B for \"{split_name}\" configures split with more than 2 variants"
                ))?;
            }
            false_variant = split
                .resolution_order()
                .into_iter()
                .map(|(name, _)| name)
                .find(|name| *name != true_variant)
                .map(str::to_string);
        }

        Ok(Self {
            split_name,
            true_variant,
            false_variant: false_variant.unwrap_or_else(|| FALLBACK_FALSE_VARIANT.to_string()),
        })
    }

    /// Split name
    #[inline]
    #[must_use]
    pub fn split_name(&self) -> &str {
        &self.split_name
    }

    /// Variant meaning `true`
    #[inline]
    #[must_use]
    pub fn true_variant(&self) -> &str {
        &self.true_variant
    }

    /// Variant meaning `false`, also the default
    #[inline]
    #[must_use]
    pub fn false_variant(&self) -> &str {
        &self.false_variant
    }

    /// Branch `assignment` into `true`/`false`
    ///
    /// # Errors
    /// Anything [`VaryDsl`] reports
    pub fn run(
        &self,
        assignment: &mut Assignment,
        context: impl Into<String>,
        registry: Option<&SplitRegistry>,
        notifier: &dyn MisconfigurationNotifier,
    ) -> Result<VaryOutcome<bool>, VaryError> {
        let mut dsl = VaryDsl::new(assignment, context, registry, notifier)?;
        dsl.when([self.true_variant.as_str()], || true)?;
        dsl.default(self.false_variant.as_str(), || false)?;
        dsl.run()
    }
}
