//! Variant branching DSL
//!
//! [`VaryDsl`] lets a caller register one behavior per variant plus one
//! default, checks the registrations against the registry, and runs the
//! behavior matching the visitor's assignment.
//!
//! # Lifecycle
//! 1. Build: assignment, context, notifier and an optional registry
//! 2. Register: any number of `when` calls and exactly one `default`
//! 3. Run: consumes the DSL; an instance is single-use
//!
//! Unknown variants are reported when registered. Registry variants left
//! without a behavior are reported once, as a single message, at run time.
//! Both checks are skipped when the registry is absent.

use crate::error::{ConfigError, Misconfiguration, VaryError};
use crate::notifier::MisconfigurationNotifier;
use indexmap::IndexMap;
use splitkit_registry::{Assignment, SplitRegistry};
use std::fmt;

type Behavior<'f, R> = Box<dyn FnOnce() -> R + 'f>;

/// Result of [`VaryDsl::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryOutcome<R> {
    /// Value returned by the behavior that ran
    pub value: R,
    /// Whether the default behavior ran
    pub defaulted: bool,
    /// Whether this run decided the assignment's variant
    pub decided: bool,
}

impl<R> VaryOutcome<R> {
    /// Unwrap the behavior's value
    #[inline]
    pub fn into_value(self) -> R {
        self.value
    }
}

/// Builder for [`VaryDsl`]
///
/// Mirrors the loosely typed construction path: unknown options and missing
/// required fields are reported by [`VaryDslBuilder::build`].
#[derive(Default)]
pub struct VaryDslBuilder<'a> {
    assignment: Option<&'a mut Assignment>,
    context: Option<String>,
    registry: Option<&'a SplitRegistry>,
    notifier: Option<&'a dyn MisconfigurationNotifier>,
    unknown: Vec<String>,
}

impl<'a> VaryDslBuilder<'a> {
    /// Empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assignment to branch on (required)
    #[must_use]
    pub fn assignment(mut self, assignment: &'a mut Assignment) -> Self {
        self.assignment = Some(assignment);
        self
    }

    /// Call-site label (required)
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Registry to validate against; `None` skips validation
    #[must_use]
    pub fn split_registry(mut self, registry: Option<&'a SplitRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Misconfiguration strategy (required)
    #[must_use]
    pub fn notifier(mut self, notifier: &'a dyn MisconfigurationNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set a string-keyed option
    ///
    /// Only `context` is understood; anything else fails at build time.
    #[must_use]
    pub fn option(mut self, key: &str, value: &str) -> Self {
        match key {
            "context" => self.context = Some(value.to_string()),
            other => self.unknown.push(other.to_string()),
        }
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// - `ConfigError::UnknownOptions` for unrecognized options
    /// - `ConfigError::MissingField` for a missing assignment, context or notifier
    /// - `ConfigError::UnknownSplit` if a loaded registry lacks the split
    pub fn build<'f, R>(self) -> Result<VaryDsl<'a, 'f, R>, ConfigError> {
        if !self.unknown.is_empty() {
            return Err(ConfigError::UnknownOptions(self.unknown));
        }
        let assignment = self.assignment.ok_or(ConfigError::MissingField("assignment"))?;
        let context = self.context.ok_or(ConfigError::MissingField("context"))?;
        let notifier = self.notifier.ok_or(ConfigError::MissingField("notifier"))?;

        if let Some(registry) = self.registry {
            if !registry.exists(assignment.split_name()) {
                return Err(ConfigError::UnknownSplit(assignment.split_name().to_string()));
            }
        }

        Ok(VaryDsl {
            assignment,
            context,
            registry: self.registry,
            notifier,
            variant_behaviors: IndexMap::new(),
            behaviors: Vec::new(),
            default_variant: None,
        })
    }
}

/// Per-variant branching over one assignment
pub struct VaryDsl<'a, 'f, R> {
    assignment: &'a mut Assignment,
    context: String,
    registry: Option<&'a SplitRegistry>,
    notifier: &'a dyn MisconfigurationNotifier,
    variant_behaviors: IndexMap<String, usize>,
    behaviors: Vec<Behavior<'f, R>>,
    default_variant: Option<String>,
}

impl<'a, 'f, R> VaryDsl<'a, 'f, R> {
    /// Start a builder
    #[inline]
    #[must_use]
    pub fn builder() -> VaryDslBuilder<'a> {
        VaryDslBuilder::new()
    }

    /// Build directly from the required parts
    ///
    /// # Errors
    /// `ConfigError::UnknownSplit` if a loaded registry lacks the split
    pub fn new(
        assignment: &'a mut Assignment,
        context: impl Into<String>,
        registry: Option<&'a SplitRegistry>,
        notifier: &'a dyn MisconfigurationNotifier,
    ) -> Result<Self, ConfigError> {
        VaryDslBuilder::new()
            .assignment(assignment)
            .context(context)
            .split_registry(registry)
            .notifier(notifier)
            .build()
    }

    /// Split being branched on
    #[inline]
    #[must_use]
    pub fn split_name(&self) -> &str {
        self.assignment.split_name()
    }

    /// Variant registered through `default`
    #[inline]
    #[must_use]
    pub fn default_variant(&self) -> Option<&str> {
        self.default_variant.as_deref()
    }

    /// Registered variant names in registration order
    pub fn registered_variants(&self) -> impl Iterator<Item = &str> {
        self.variant_behaviors.keys().map(String::as_str)
    }

    /// Register `behavior` for one or more variants
    ///
    /// # Errors
    /// - `ConfigError::NoVariants` if `variants` is empty
    /// - `VaryError::Misconfigured` if the notifier raises on an unknown variant
    pub fn when<I, S>(
        &mut self,
        variants: I,
        behavior: impl FnOnce() -> R + 'f,
    ) -> Result<&mut Self, VaryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        if variants.is_empty() {
            return Err(ConfigError::NoVariants.into());
        }
        for variant in &variants {
            self.check_variant(variant)?;
        }

        let idx = self.push_behavior(behavior);
        for variant in variants {
            self.variant_behaviors.insert(variant, idx);
        }
        Ok(self)
    }

    /// Register the default behavior
    ///
    /// Runs for `variant`, and whenever the assignment has no matching
    /// behavior. An undecided assignment is decided as `variant`.
    ///
    /// # Errors
    /// - `ConfigError::DefaultCount` if a default is already registered
    /// - `VaryError::Misconfigured` if the notifier raises on an unknown variant
    pub fn default(
        &mut self,
        variant: impl Into<String>,
        behavior: impl FnOnce() -> R + 'f,
    ) -> Result<&mut Self, VaryError> {
        if self.default_variant.is_some() {
            return Err(ConfigError::DefaultCount.into());
        }
        let variant = variant.into();
        self.check_variant(&variant)?;

        let idx = self.push_behavior(behavior);
        self.variant_behaviors.insert(variant.clone(), idx);
        self.default_variant = Some(variant);
        Ok(self)
    }

    /// Run the matching behavior
    ///
    /// # Errors
    /// - `ConfigError::DefaultCount` if no default was registered
    /// - `VaryError::Misconfigured` if the notifier raises on uncovered variants
    pub fn run(mut self) -> Result<VaryOutcome<R>, VaryError> {
        let Some(default_variant) = self.default_variant.take() else {
            return Err(ConfigError::DefaultCount.into());
        };
        self.check_coverage()?;

        self.assignment.set_context(std::mem::take(&mut self.context));

        let matched = self
            .assignment
            .variant()
            .and_then(|variant| self.variant_behaviors.get(variant).copied());

        let (idx, defaulted, decided) = match matched {
            Some(idx) => (idx, false, false),
            None => {
                let decided = self.assignment.decide(default_variant.as_str());
                if !decided {
                    tracing::debug!(
                        split = self.assignment.split_name(),
                        variant = self.assignment.variant(),
                        "no behavior for assigned variant; running default"
                    );
                }
                (self.variant_behaviors[&default_variant], true, decided)
            }
        };

        let behavior = self.behaviors.swap_remove(idx);
        Ok(VaryOutcome {
            value: behavior(),
            defaulted,
            decided,
        })
    }

    fn push_behavior(&mut self, behavior: impl FnOnce() -> R + 'f) -> usize {
        self.behaviors.push(Box::new(behavior));
        self.behaviors.len() - 1
    }

    fn check_variant(&self, variant: &str) -> Result<(), Misconfiguration> {
        let Some(split) = self.registry.and_then(|r| r.split(self.split_name())) else {
            return Ok(());
        };
        if split.has_variant(variant) {
            return Ok(());
        }
        self.notifier.notify(&format!(
            "vary for \"{}\" configures unknown variant \"{variant}\"",
            split.name()
        ))
    }

    fn check_coverage(&self) -> Result<(), Misconfiguration> {
        let Some(split) = self.registry.and_then(|r| r.split(self.split_name())) else {
            return Ok(());
        };
        let missing: Vec<&str> = split
            .variant_names()
            .filter(|variant| !self.variant_behaviors.contains_key(*variant))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        self.notifier.notify(&format!(
            "vary for \"{}\" does not configure variants {}",
            split.name(),
            to_sentence(&missing)
        ))
    }
}

impl<R> fmt::Debug for VaryDsl<'_, '_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaryDsl")
            .field("split", &self.split_name())
            .field("context", &self.context)
            .field("registered", &self.variant_behaviors.keys().collect::<Vec<_>>())
            .field("default_variant", &self.default_variant)
            .field("registry_loaded", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

/// `a`, `a and b`, `a, b, and c`
fn to_sentence(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => (*one).to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
