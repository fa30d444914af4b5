//! Caller-facing client
//!
//! [`SplitClient`] is what application code talks to. Every call names the
//! identity it is about and, inside a request, passes the request's
//! [`WebContext`]; the client picks the online or offline scope from there.

use crate::analytics::AnalyticsClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, UsageError};
use crate::identifier::{Identifier, IdentifierService};
use crate::identity::{Identity, Scope, WebContext};
use crate::session::{
    Collaborators, LogInOptions, OfflineSession, OnlineSession, Session, VisitorDsl,
};
use splitkit_registry::{RegistryHandle, VisitorId};
use splitkit_vary::{AlertSink, MisconfigurationNotifier, VaryDsl, VaryError};
use std::fmt;
use std::sync::Arc;

/// Entry point for resolving, branching and identity linking
pub struct SplitClient {
    registry: Arc<RegistryHandle>,
    analytics: Arc<dyn AnalyticsClient>,
    identifiers: Arc<dyn IdentifierService>,
    notifier: Arc<dyn MisconfigurationNotifier>,
    config: ClientConfig,
}

impl SplitClient {
    /// Create client
    ///
    /// The misconfiguration strategy follows `config.environment`.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        registry: Arc<RegistryHandle>,
        analytics: Arc<dyn AnalyticsClient>,
        identifiers: Arc<dyn IdentifierService>,
    ) -> Self {
        Self {
            notifier: config.notifier_policy().build(None),
            registry,
            analytics,
            identifiers,
            config,
        }
    }

    /// Forward logged misconfiguration to `sink`
    #[must_use]
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.notifier = self.config.notifier_policy().build(Some(sink));
        self
    }

    /// Replace the misconfiguration strategy
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn MisconfigurationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Client configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared registry handle
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<RegistryHandle> {
        &self.registry
    }

    /// Collaborators bound to the current registry snapshot
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            registry: self.registry.snapshot(),
            notifier: Arc::clone(&self.notifier),
            analytics: Arc::clone(&self.analytics),
            identifiers: Arc::clone(&self.identifiers),
        }
    }

    /// Start the session for a request
    ///
    /// `visitor_id` is the id the request carried, if any.
    #[must_use]
    pub fn online_session(&self, visitor_id: Option<VisitorId>) -> OnlineSession {
        OnlineSession::new(visitor_id, self.collaborators())
    }

    /// Run `f` against the visitor `identity` resolves to
    ///
    /// # Errors
    /// Failure fetching an offline visitor, or whatever `f` returns
    pub fn with_visitor<R, F>(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
        f: F,
    ) -> Result<R, ClientError>
    where
        F: FnOnce(&mut VisitorDsl<'_>) -> Result<R, ClientError>,
    {
        let identifier = identity.identifier();
        let scope = Scope::choose(web.as_deref(), &identifier, self.config.unmatched_identity);
        match (scope, web) {
            (Scope::Online, Some(web)) => {
                let mut dsl = web.session.visitor_dsl();
                f(&mut dsl)
            }
            _ => self.offline(&identifier, f),
        }
    }

    /// Variant `identity` sees for `split_name`
    ///
    /// # Errors
    /// Registry, transport or collaborator errors
    pub fn resolve_variant(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
        split_name: &str,
        context: &str,
    ) -> Result<Option<String>, ClientError> {
        self.with_visitor(web, identity, |dsl| dsl.resolve_variant(split_name, context))
    }

    /// Branch on `split_name` for `identity`
    ///
    /// # Errors
    /// Configuration errors, raised misconfiguration, transport errors
    pub fn vary<'f, R, F>(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
        split_name: &str,
        context: &str,
        configure: F,
    ) -> Result<R, ClientError>
    where
        F: for<'a> FnOnce(&mut VaryDsl<'a, 'f, R>) -> Result<(), VaryError>,
    {
        self.with_visitor(web, identity, |dsl| dsl.vary(split_name, context, configure))
    }

    /// Boolean branch on `split_name` for `identity`
    ///
    /// `true_variant` falls back to the configured default.
    ///
    /// # Errors
    /// Configuration errors, raised misconfiguration, transport errors
    pub fn ab(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
        split_name: &str,
        context: &str,
        true_variant: Option<&str>,
    ) -> Result<bool, ClientError> {
        let true_variant = true_variant.unwrap_or(self.config.default_true_variant.as_str());
        self.with_visitor(web, identity, |dsl| dsl.ab(split_name, context, Some(true_variant)))
    }

    /// Visitor id `identity` resolves to
    ///
    /// # Errors
    /// Failure fetching an offline visitor
    pub fn visitor_id(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
    ) -> Result<VisitorId, ClientError> {
        self.with_visitor(web, identity, |dsl| Ok(dsl.id().clone()))
    }

    /// Link a newly registered `identity` to the request's visitor
    ///
    /// # Errors
    /// `UsageError::OutsideWebContext` without a request, transport errors
    pub fn sign_up(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
    ) -> Result<(), ClientError> {
        let web = web.ok_or(UsageError::OutsideWebContext)?;
        web.session.sign_up(&identity.identifier())
    }

    /// Link an authenticated `identity` to the request's visitor
    ///
    /// # Errors
    /// `UsageError::OutsideWebContext` without a request, transport errors
    pub fn log_in(
        &self,
        web: Option<&mut WebContext<'_>>,
        identity: &dyn Identity,
        options: LogInOptions,
    ) -> Result<(), ClientError> {
        let web = web.ok_or(UsageError::OutsideWebContext)?;
        web.session.log_in(&identity.identifier(), options)
    }

    fn offline<R, F>(&self, identifier: &Identifier, f: F) -> Result<R, ClientError>
    where
        F: FnOnce(&mut VisitorDsl<'_>) -> Result<R, ClientError>,
    {
        OfflineSession::with_visitor_for(identifier, &self.collaborators(), f)
    }
}

impl fmt::Debug for SplitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitClient")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
