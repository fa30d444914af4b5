//! Misconfiguration reporting strategies
//!
//! The hosting application picks one [`MisconfigurationNotifier`] per
//! environment; call sites never inspect the environment themselves.
//!
//! - [`RaisingNotifier`]: fails the call so mistakes surface while authoring
//! - [`LoggingNotifier`]: logs an error and forwards to an optional
//!   [`AlertSink`], never fails

use crate::error::Misconfiguration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reports DSL/registry mismatches
#[cfg_attr(test, mockall::automock)]
pub trait MisconfigurationNotifier: Send + Sync {
    /// Report a mismatch
    ///
    /// # Errors
    /// Strategies that raise return the report as an error
    fn notify(&self, message: &str) -> Result<(), Misconfiguration>;
}

/// External alerting integration
///
/// Adapters implement [`AlertSink::notify`]. Integrations that also offer a
/// non-throwing variant override [`AlertSink::notify_or_ignore`], which is the
/// entry point the notifier uses.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send + Sync {
    /// Forward an alert
    fn notify(&self, error: &Misconfiguration, error_message: &str);

    /// Forward an alert, swallowing any failure of the integration
    fn notify_or_ignore(&self, error: &Misconfiguration, error_message: &str) {
        self.notify(error, error_message);
    }
}

/// Fails every report
#[derive(Debug, Clone, Copy, Default)]
pub struct RaisingNotifier;

impl MisconfigurationNotifier for RaisingNotifier {
    fn notify(&self, message: &str) -> Result<(), Misconfiguration> {
        Err(Misconfiguration::new(message))
    }
}

/// Logs reports and forwards them to an alert sink
#[derive(Clone, Default)]
pub struct LoggingNotifier {
    alert_sink: Option<Arc<dyn AlertSink>>,
}

impl LoggingNotifier {
    /// Log only
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and forward to `sink`
    #[inline]
    #[must_use]
    pub fn with_alert_sink(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            alert_sink: Some(sink),
        }
    }
}

impl fmt::Debug for LoggingNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingNotifier")
            .field("alert_sink", &self.alert_sink.is_some())
            .finish()
    }
}

impl MisconfigurationNotifier for LoggingNotifier {
    fn notify(&self, message: &str) -> Result<(), Misconfiguration> {
        tracing::error!("{message}");
        if let Some(sink) = &self.alert_sink {
            sink.notify_or_ignore(&Misconfiguration::new(message), message);
        }
        Ok(())
    }
}

/// Hosting environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Test suite
    Test,
    /// Production or anything production-like
    Production,
}

impl Environment {
    /// Whether misconfiguration must never fail a call
    #[inline]
    #[must_use]
    pub fn is_production_like(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Notifier selection per environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierPolicy {
    /// Fail on misconfiguration
    Raise,
    /// Log and alert, never fail
    Log,
}

impl NotifierPolicy {
    /// Policy matching an environment
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        if environment.is_production_like() {
            Self::Log
        } else {
            Self::Raise
        }
    }

    /// Build the notifier for this policy
    ///
    /// `alert_sink` is only used by [`NotifierPolicy::Log`].
    #[must_use]
    pub fn build(
        self,
        alert_sink: Option<Arc<dyn AlertSink>>,
    ) -> Arc<dyn MisconfigurationNotifier> {
        match self {
            Self::Raise => Arc::new(RaisingNotifier),
            Self::Log => Arc::new(LoggingNotifier { alert_sink }),
        }
    }
}
