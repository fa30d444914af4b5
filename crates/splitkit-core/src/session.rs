//! Online and offline sessions
//!
//! A session owns exactly one [`Visitor`] and decides when its assignments
//! reach the analytics collector:
//!
//! - [`OnlineSession`]: bound to a live request; assignments batch until
//!   [`OnlineSession::flush`]
//! - [`OfflineSession`]: single-use, outside any request; every resolution
//!   call reports its new assignments before returning
//!
//! Callers reach the visitor through a [`VisitorDsl`], which applies the
//! session's [`SyncTiming`].

use crate::analytics::{AnalyticsClient, UnsyncedAssignmentsNotifier};
use crate::error::{ClientError, UsageError};
use crate::identifier::{Identifier, IdentifierService, RemoteVisitor};
use crate::visitor::Visitor;
use splitkit_registry::{SplitRegistry, VisitorId};
use splitkit_vary::{MisconfigurationNotifier, VaryDsl, VaryError};
use std::fmt;
use std::sync::Arc;

/// Shared collaborators a session works with
#[derive(Clone)]
pub struct Collaborators {
    /// Registry snapshot for the session's lifetime
    pub registry: Option<Arc<SplitRegistry>>,
    /// Misconfiguration strategy
    pub notifier: Arc<dyn MisconfigurationNotifier>,
    /// Analytics collector
    pub analytics: Arc<dyn AnalyticsClient>,
    /// Remote identifier mapping
    pub identifiers: Arc<dyn IdentifierService>,
}

impl Collaborators {
    fn visitor(&self, id: Option<VisitorId>) -> Visitor {
        let registry = self.registry.clone();
        let notifier = Arc::clone(&self.notifier);
        match id {
            Some(id) => Visitor::with_id(id, registry, notifier),
            None => Visitor::new(registry, notifier),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("registry_loaded", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

/// When new assignments are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTiming {
    /// At the session's flush point
    Deferred,
    /// Before the resolution call returns
    Immediate,
}

/// Options for [`Session::log_in`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogInOptions {
    /// Start from a fresh visitor instead of the current one
    pub forget_current_visitor: bool,
}

/// Resolution entry points over a session's visitor
pub struct VisitorDsl<'s> {
    visitor: &'s mut Visitor,
    distinct_id: &'s str,
    analytics: &'s dyn AnalyticsClient,
    timing: SyncTiming,
}

impl<'s> VisitorDsl<'s> {
    fn new(
        visitor: &'s mut Visitor,
        distinct_id: &'s str,
        analytics: &'s dyn AnalyticsClient,
        timing: SyncTiming,
    ) -> Self {
        Self {
            visitor,
            distinct_id,
            analytics,
            timing,
        }
    }

    /// Visitor id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &VisitorId {
        self.visitor.id()
    }

    /// Sync timing applied by this handle
    #[inline]
    #[must_use]
    pub fn timing(&self) -> SyncTiming {
        self.timing
    }

    /// Underlying visitor
    #[inline]
    #[must_use]
    pub fn visitor(&self) -> &Visitor {
        &*self.visitor
    }

    /// Variant for `split_name`
    ///
    /// # Errors
    /// Registry errors, or an analytics failure under immediate sync
    pub fn resolve_variant(
        &mut self,
        split_name: &str,
        context: &str,
    ) -> Result<Option<String>, ClientError> {
        let variant = self.visitor.resolve_variant(split_name, context)?;
        self.after_resolution()?;
        Ok(variant)
    }

    /// Branch on `split_name`
    ///
    /// # Errors
    /// Anything [`Visitor::vary`] reports, or an analytics failure under
    /// immediate sync
    pub fn vary<'f, R, F>(
        &mut self,
        split_name: &str,
        context: &str,
        configure: F,
    ) -> Result<R, ClientError>
    where
        F: for<'a> FnOnce(&mut VaryDsl<'a, 'f, R>) -> Result<(), VaryError>,
    {
        let value = self.visitor.vary(split_name, context, configure)?;
        self.after_resolution()?;
        Ok(value)
    }

    /// Boolean branch on `split_name`
    ///
    /// # Errors
    /// Anything [`Visitor::ab`] reports, or an analytics failure under
    /// immediate sync
    pub fn ab(
        &mut self,
        split_name: &str,
        context: &str,
        true_variant: Option<&str>,
    ) -> Result<bool, ClientError> {
        let value = self.visitor.ab(split_name, context, true_variant)?;
        self.after_resolution()?;
        Ok(value)
    }

    fn after_resolution(&mut self) -> Result<(), ClientError> {
        if self.timing == SyncTiming::Immediate && self.visitor.has_unsynced() {
            UnsyncedAssignmentsNotifier::new(self.distinct_id, self.visitor)
                .notify(self.analytics)?;
        }
        Ok(())
    }
}

impl fmt::Debug for VisitorDsl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitorDsl")
            .field("visitor_id", self.visitor.id())
            .field("distinct_id", &self.distinct_id)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

/// Capabilities shared by both session kinds
pub trait Session {
    /// Resolution handle with this session's sync timing
    fn visitor_dsl(&mut self) -> VisitorDsl<'_>;

    /// Associate a newly registered identity with the visitor
    ///
    /// # Errors
    /// Usage error outside a request, transport errors otherwise
    fn sign_up(&mut self, identifier: &Identifier) -> Result<(), ClientError>;

    /// Associate an authenticated identity with the visitor
    ///
    /// # Errors
    /// Usage error outside a request, transport errors otherwise
    fn log_in(&mut self, identifier: &Identifier, options: LogInOptions) -> Result<(), ClientError>;
}

/// Session bound to a live request
#[derive(Debug)]
pub struct OnlineSession {
    visitor: Visitor,
    distinct_id: String,
    collaborators: Collaborators,
}

impl OnlineSession {
    /// Session for the request's visitor
    ///
    /// `visitor_id` is the id the request carried, if any; otherwise a new
    /// visitor is created.
    #[must_use]
    pub fn new(visitor_id: Option<VisitorId>, collaborators: Collaborators) -> Self {
        let visitor = collaborators.visitor(visitor_id);
        Self {
            distinct_id: visitor.id().to_string(),
            visitor,
            collaborators,
        }
    }

    /// Request's visitor
    #[inline]
    #[must_use]
    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    /// Request's visitor id
    #[inline]
    #[must_use]
    pub fn visitor_id(&self) -> &VisitorId {
        self.visitor.id()
    }

    /// Identity assignments are tracked under
    ///
    /// The visitor id until sign-up or log-in changes it.
    #[inline]
    #[must_use]
    pub fn distinct_id(&self) -> &str {
        &self.distinct_id
    }

    /// Report every pending assignment
    ///
    /// Returns how many were reported.
    ///
    /// # Errors
    /// The first analytics failure; unreported assignments stay pending
    pub fn flush(&mut self) -> Result<usize, ClientError> {
        let reported = UnsyncedAssignmentsNotifier::new(&self.distinct_id, &mut self.visitor)
            .notify(self.collaborators.analytics.as_ref())?;
        if reported > 0 {
            tracing::info!(
                visitor_id = %self.visitor.id(),
                reported,
                "flushed assignments"
            );
        }
        Ok(reported)
    }

    fn link(
        &self,
        visitor_id: &VisitorId,
        identifier: &Identifier,
    ) -> Result<RemoteVisitor, ClientError> {
        Ok(self
            .collaborators
            .identifiers
            .link_identifier(visitor_id, identifier)?)
    }

    /// Merge `remote` and make it the session's identity
    ///
    /// Only called once every collaborator call has succeeded.
    fn adopt(&mut self, fresh: Option<Visitor>, remote: RemoteVisitor) {
        if let Some(fresh) = fresh {
            self.visitor = fresh;
        }
        self.visitor.merge(remote);
        self.distinct_id = self.visitor.id().to_string();
    }
}

impl Session for OnlineSession {
    fn visitor_dsl(&mut self) -> VisitorDsl<'_> {
        VisitorDsl::new(
            &mut self.visitor,
            &self.distinct_id,
            self.collaborators.analytics.as_ref(),
            SyncTiming::Deferred,
        )
    }

    fn sign_up(&mut self, identifier: &Identifier) -> Result<(), ClientError> {
        let remote = self.link(self.visitor.id(), identifier)?;
        self.collaborators
            .analytics
            .alias(&self.distinct_id, remote.id.as_str())?;
        self.adopt(None, remote);
        tracing::debug!(%identifier, visitor_id = %self.visitor.id(), "signed up");
        Ok(())
    }

    fn log_in(
        &mut self,
        identifier: &Identifier,
        options: LogInOptions,
    ) -> Result<(), ClientError> {
        let fresh = options
            .forget_current_visitor
            .then(|| self.collaborators.visitor(None));
        let visitor_id = fresh.as_ref().map_or(self.visitor.id(), Visitor::id);
        let remote = self.link(visitor_id, identifier)?;

        self.adopt(fresh, remote);
        tracing::debug!(%identifier, visitor_id = %self.visitor.id(), "logged in");
        Ok(())
    }
}

/// Single-use session outside any request
pub struct OfflineSession {
    visitor: Visitor,
    distinct_id: String,
    analytics: Arc<dyn AnalyticsClient>,
}

impl fmt::Debug for OfflineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineSession")
            .field("visitor", &self.visitor)
            .field("distinct_id", &self.distinct_id)
            .finish_non_exhaustive()
    }
}

impl OfflineSession {
    /// Session around an already reconstituted visitor
    #[must_use]
    pub fn from_remote(remote: RemoteVisitor, collaborators: &Collaborators) -> Self {
        let mut visitor = collaborators.visitor(Some(remote.id.clone()));
        visitor.merge(remote);
        Self {
            distinct_id: visitor.id().to_string(),
            visitor,
            analytics: Arc::clone(&collaborators.analytics),
        }
    }

    /// Run `f` against the visitor that owns `identifier`
    ///
    /// # Errors
    /// Failure fetching the visitor, or whatever `f` returns
    pub fn with_visitor_for<R, F>(
        identifier: &Identifier,
        collaborators: &Collaborators,
        f: F,
    ) -> Result<R, ClientError>
    where
        F: FnOnce(&mut VisitorDsl<'_>) -> Result<R, ClientError>,
    {
        let remote = collaborators.identifiers.visitor_for(identifier)?;
        let mut session = Self::from_remote(remote, collaborators);
        let mut dsl = session.visitor_dsl();
        f(&mut dsl)
    }

    /// Session's visitor
    #[inline]
    #[must_use]
    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }
}

impl Session for OfflineSession {
    fn visitor_dsl(&mut self) -> VisitorDsl<'_> {
        VisitorDsl::new(
            &mut self.visitor,
            &self.distinct_id,
            self.analytics.as_ref(),
            SyncTiming::Immediate,
        )
    }

    fn sign_up(&mut self, _identifier: &Identifier) -> Result<(), ClientError> {
        Err(UsageError::OutsideWebContext.into())
    }

    fn log_in(
        &mut self,
        _identifier: &Identifier,
        _options: LogInOptions,
    ) -> Result<(), ClientError> {
        Err(UsageError::OutsideWebContext.into())
    }
}
