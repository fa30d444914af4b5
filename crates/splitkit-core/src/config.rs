//! Client configuration

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use splitkit_vary::{Environment, NotifierPolicy, DEFAULT_TRUE_VARIANT};

/// What to do when a web context exists but its current identity does not
/// match the identity being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedIdentityPolicy {
    /// Use the request's visitor; assignments still batch
    #[default]
    OnlineScope,
    /// Use an offline session for the identity
    Offline,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hosting environment, selects the misconfiguration strategy
    pub environment: Environment,
    /// Scope used for identities that are not the current one
    pub unmatched_identity: UnmatchedIdentityPolicy,
    /// Variant `ab` treats as `true` unless told otherwise
    pub default_true_variant: String,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode from JSON; missing keys take their defaults
    ///
    /// # Errors
    /// `ClientError::Config` if the document is malformed
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// With environment
    #[inline]
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// With unmatched identity policy
    #[inline]
    #[must_use]
    pub fn with_unmatched_identity(mut self, policy: UnmatchedIdentityPolicy) -> Self {
        self.unmatched_identity = policy;
        self
    }

    /// With default `ab` true variant
    #[inline]
    #[must_use]
    pub fn with_default_true_variant(mut self, variant: impl Into<String>) -> Self {
        self.default_true_variant = variant.into();
        self
    }

    /// Notifier strategy for the configured environment
    #[inline]
    #[must_use]
    pub fn notifier_policy(&self) -> NotifierPolicy {
        NotifierPolicy::for_environment(self.environment)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            unmatched_identity: UnmatchedIdentityPolicy::default(),
            default_true_variant: DEFAULT_TRUE_VARIANT.to_string(),
        }
    }
}
