//! Visitor identifiers and assignments
//!
//! An [`Assignment`] is one visitor's resolved (or pending) variant for one
//! split, plus whether it still has to be reported to analytics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque visitor identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisitorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VisitorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One visitor's variant for one split
///
/// Once `variant` is set it is never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    visitor_id: VisitorId,
    split_name: String,
    variant: Option<String>,
    context: Option<String>,
    unsynced: bool,
}

impl Assignment {
    /// Create an assignment that still has to be reported
    #[must_use]
    pub fn new(
        visitor_id: VisitorId,
        split_name: impl Into<String>,
        variant: Option<String>,
    ) -> Self {
        Self {
            visitor_id,
            split_name: split_name.into(),
            variant,
            context: None,
            unsynced: true,
        }
    }

    /// Create an assignment already known to the collector (e.g. fetched remotely)
    #[must_use]
    pub fn synced(
        visitor_id: VisitorId,
        split_name: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            unsynced: false,
            ..Self::new(visitor_id, split_name, Some(variant.into()))
        }
    }

    /// Owning visitor
    #[inline]
    #[must_use]
    pub fn visitor_id(&self) -> &VisitorId {
        &self.visitor_id
    }

    /// Split name
    #[inline]
    #[must_use]
    pub fn split_name(&self) -> &str {
        &self.split_name
    }

    /// Resolved variant, `None` if undecided
    #[inline]
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Call-site label used for analytics segmentation
    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Whether the assignment still has to be reported
    #[inline]
    #[must_use]
    pub fn is_unsynced(&self) -> bool {
        self.unsynced
    }

    /// Whether a variant has been decided
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.variant.is_some()
    }

    /// Set the variant if none is set yet
    ///
    /// Returns `true` if this call decided the variant.
    pub fn decide(&mut self, variant: impl Into<String>) -> bool {
        if self.variant.is_some() {
            return false;
        }
        self.variant = Some(variant.into());
        true
    }

    /// Label the call site
    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = Some(context.into());
    }

    /// Mark as reported
    #[inline]
    pub fn mark_synced(&mut self) {
        self.unsynced = false;
    }

    /// Mark as pending report
    #[inline]
    pub fn mark_unsynced(&mut self) {
        self.unsynced = true;
    }

    /// Move the assignment to another visitor id (after an identity merge)
    pub fn rebind(&mut self, visitor_id: VisitorId) {
        self.visitor_id = visitor_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_assignment_is_unsynced() {
        let a = Assignment::new(VisitorId::new("v1"), "blue_button", None);
        assert!(a.is_unsynced());
        assert!(!a.is_resolved());
        assert_eq!(a.split_name(), "blue_button");
    }

    #[test]
    fn decide_never_overwrites() {
        let mut a = Assignment::new(VisitorId::new("v1"), "button_size", None);
        assert!(a.decide("two"));
        assert!(!a.decide("three"));
        assert_eq!(a.variant(), Some("two"));
    }

    #[test]
    fn synced_assignment() {
        let a = Assignment::synced(VisitorId::new("v1"), "time", "hammertime");
        assert!(!a.is_unsynced());
        assert_eq!(a.variant(), Some("hammertime"));
    }

    #[test]
    fn context_and_sync_flags() {
        let mut a = Assignment::new(VisitorId::new("v1"), "time", Some("hammertime".into()));
        a.set_context("menu");
        a.mark_synced();
        assert_eq!(a.context(), Some("menu"));
        assert!(!a.is_unsynced());
        a.mark_unsynced();
        assert!(a.is_unsynced());
    }

    #[test]
    fn visitor_id_serializes_as_string() {
        let json = serde_json::to_string(&VisitorId::new("fake_visitor_id")).unwrap();
        assert_eq!(json, "\"fake_visitor_id\"");
    }
}
