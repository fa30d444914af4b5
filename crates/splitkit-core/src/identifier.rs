//! Identifiers and the identifier collaborator
//!
//! An [`Identifier`] ties a domain identity (e.g. `clown_id` `1234`) to a
//! visitor on the split service. [`IdentifierService`] is the remote side
//! that owns that mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use splitkit_registry::VisitorId;
use std::fmt;

/// Typed identifier of a domain object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier kind, e.g. `clown_id`
    pub identifier_type: String,
    /// Identifier value
    pub value: String,
}

impl Identifier {
    /// Create identifier
    #[inline]
    #[must_use]
    pub fn new(identifier_type: impl Into<String>, value: impl ToString) -> Self {
        Self {
            identifier_type: identifier_type.into(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identifier_type, self.value)
    }
}

/// Visitor as known to the split service
///
/// Its assignments are already reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteVisitor {
    /// Visitor id
    pub id: VisitorId,
    /// Split name → variant
    #[serde(default)]
    pub assignments: IndexMap<String, String>,
}

impl RemoteVisitor {
    /// Visitor without assignments
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<VisitorId>) -> Self {
        Self {
            id: id.into(),
            assignments: IndexMap::new(),
        }
    }

    /// Add an assignment
    #[must_use]
    pub fn with_assignment(
        mut self,
        split_name: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        self.assignments.insert(split_name.into(), variant.into());
        self
    }
}

/// Remote identifier mapping
#[cfg_attr(test, mockall::automock)]
pub trait IdentifierService: Send + Sync {
    /// Attach `identifier` to `visitor_id`
    ///
    /// Returns the visitor that now owns the identifier, which may be a
    /// different, pre-existing visitor.
    ///
    /// # Errors
    /// Transport failures, unchanged
    fn link_identifier(
        &self,
        visitor_id: &VisitorId,
        identifier: &Identifier,
    ) -> anyhow::Result<RemoteVisitor>;

    /// Visitor owning `identifier`, created remotely if needed
    ///
    /// # Errors
    /// Transport failures, unchanged
    fn visitor_for(&self, identifier: &Identifier) -> anyhow::Result<RemoteVisitor>;
}
