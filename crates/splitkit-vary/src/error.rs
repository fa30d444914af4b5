//! Error types for variant branching
//!
//! Two families:
//! - [`ConfigError`]: construction-time mistakes, always fatal
//! - [`Misconfiguration`]: DSL/registry mismatches, fatal only when the
//!   notifier strategy chooses to raise them

use splitkit_registry::RegistryError;

/// Fatal configuration errors raised at construction or registration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required field was not supplied
    #[error("must provide {0}")]
    MissingField(&'static str),

    /// Options that are not understood
    #[error("unknown opts: {}", .0.join(", "))]
    UnknownOptions(Vec<String>),

    /// Split not present in a loaded registry
    #[error("unknown split: {0}")]
    UnknownSplit(String),

    /// `when` called without variant names
    #[error("must provide at least one variant")]
    NoVariants,

    /// `default` registered twice, or never registered before `run`
    #[error("must provide exactly one `default`")]
    DefaultCount,
}

/// A DSL/registry mismatch report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Misconfiguration {
    message: String,
}

impl Misconfiguration {
    /// Create report
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Report text
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Any failure out of the vary layer
#[derive(Debug, thiserror::Error)]
pub enum VaryError {
    /// Construction or registration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Misconfiguration raised by the notifier strategy
    #[error(transparent)]
    Misconfigured(#[from] Misconfiguration),

    /// Resolution against the registry failed
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl VaryError {
    /// Whether this is a fatal configuration error
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Registry(_))
    }
}
