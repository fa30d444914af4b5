//! Identity resolution
//!
//! Domain types expose their identifier through [`Identity`]. A live request
//! is represented by an explicit [`WebContext`] handle; whether the identity
//! being resolved is the request's current identity is answered by the
//! request's [`CurrentIdentity`] capability.

use crate::config::UnmatchedIdentityPolicy;
use crate::identifier::Identifier;
use crate::session::OnlineSession;
use std::fmt;

/// Domain object with a split-service identifier
pub trait Identity {
    /// Identifier of this object
    fn identifier(&self) -> Identifier;
}

impl Identity for Identifier {
    fn identifier(&self) -> Identifier {
        self.clone()
    }
}

/// Outcome of asking a request for its current identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLookup {
    /// The request has a current identity of the asked type
    Found(Identifier),
    /// The request has no current identity of that type
    Absent,
    /// The request cannot expose its current identity; treated as absent
    Inaccessible,
}

impl IdentityLookup {
    /// Whether the lookup found exactly `identifier`
    #[must_use]
    pub fn matches(&self, identifier: &Identifier) -> bool {
        match self {
            Self::Found(current) => current == identifier,
            Self::Absent | Self::Inaccessible => false,
        }
    }
}

/// Request capability answering "who is signed in as `identifier_type`"
#[cfg_attr(test, mockall::automock)]
pub trait CurrentIdentity {
    /// Current identity of `identifier_type`
    fn current(&self, identifier_type: &str) -> IdentityLookup;
}

/// Handle to a live request
pub struct WebContext<'r> {
    /// The request's session
    pub session: &'r mut OnlineSession,
    /// The request's current identity
    pub current: &'r dyn CurrentIdentity,
}

impl<'r> WebContext<'r> {
    /// Create handle
    #[inline]
    #[must_use]
    pub fn new(session: &'r mut OnlineSession, current: &'r dyn CurrentIdentity) -> Self {
        Self { session, current }
    }

    /// Whether `identifier` is the request's current identity
    #[must_use]
    pub fn is_current(&self, identifier: &Identifier) -> bool {
        let lookup = self.current.current(&identifier.identifier_type);
        if lookup == IdentityLookup::Inaccessible {
            tracing::debug!(
                identifier_type = identifier.identifier_type.as_str(),
                "current identity inaccessible; treating as absent"
            );
        }
        lookup.matches(identifier)
    }
}

impl fmt::Debug for WebContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebContext")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Scope an identity resolves in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The request's online session
    Online,
    /// A one-shot offline session
    Offline,
}

impl Scope {
    /// Pick the scope for `identifier`
    ///
    /// - no request: offline
    /// - request whose current identity matches: online
    /// - request without a match: decided by `policy`
    #[must_use]
    pub fn choose(
        web: Option<&WebContext<'_>>,
        identifier: &Identifier,
        policy: UnmatchedIdentityPolicy,
    ) -> Self {
        let Some(web) = web else {
            return Self::Offline;
        };
        if web.is_current(identifier) {
            return Self::Online;
        }
        match policy {
            UnmatchedIdentityPolicy::OnlineScope => Self::Online,
            UnmatchedIdentityPolicy::Offline => Self::Offline,
        }
    }
}
