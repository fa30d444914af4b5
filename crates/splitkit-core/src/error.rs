//! Error types for the client surface
//!
//! [`ClientError`] is what every caller-facing operation returns:
//! - configuration errors, fatal and developer-facing
//! - misconfiguration raised by a raising notifier
//! - usage errors such as signing up outside a web context
//! - transport errors from collaborators, passed through unchanged

use splitkit_registry::RegistryError;
use splitkit_vary::VaryError;

/// Calling an operation where it cannot work
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// `sign_up`/`log_in` without a live request
    #[error("called outside of a web context")]
    OutsideWebContext,
}

/// Main client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Branching failed (configuration or raised misconfiguration)
    #[error(transparent)]
    Vary(#[from] VaryError),

    /// Resolution against the registry failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Operation used outside its context
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Collaborator failure, never retried here
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// Client configuration could not be decoded
    #[error("invalid client configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ClientError {
    /// Check if error is a configuration error
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Vary(err) => err.is_configuration(),
            Self::Registry(_) | Self::Config(_) => true,
            Self::Usage(_) | Self::Transport(_) => false,
        }
    }

    /// Check if error is a usage error
    #[inline]
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if error came from a collaborator
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
