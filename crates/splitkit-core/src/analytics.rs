//! Analytics collaborator and assignment reporting

use crate::visitor::Visitor;
use serde::{Deserialize, Serialize};
use splitkit_registry::{Assignment, VisitorId};

/// Event name under which assignments are tracked
pub const ASSIGNMENT_EVENT_NAME: &str = "SplitAssigned";

/// Payload of one tracked assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    /// Visitor the assignment belongs to
    #[serde(rename = "TTVisitorID")]
    pub visitor_id: VisitorId,
    /// Split name
    #[serde(rename = "SplitName")]
    pub split_name: String,
    /// Assigned variant
    #[serde(rename = "SplitVariant")]
    pub variant: String,
    /// Call site that produced the assignment
    #[serde(rename = "SplitContext")]
    pub context: Option<String>,
}

impl AssignmentEvent {
    /// Event for a resolved assignment, `None` while undecided
    #[must_use]
    pub fn from_assignment(assignment: &Assignment) -> Option<Self> {
        Some(Self {
            visitor_id: assignment.visitor_id().clone(),
            split_name: assignment.split_name().to_string(),
            variant: assignment.variant()?.to_string(),
            context: assignment.context().map(str::to_string),
        })
    }
}

/// Analytics collector
///
/// Failures must reach the caller; nothing here retries.
#[cfg_attr(test, mockall::automock)]
pub trait AnalyticsClient: Send + Sync {
    /// Report one resolved assignment
    ///
    /// # Errors
    /// Transport failures, unchanged
    fn track_assignment(&self, distinct_id: &str, event: &AssignmentEvent) -> anyhow::Result<()>;

    /// Link a pre-login identity to a post-login identity
    ///
    /// # Errors
    /// Transport failures, unchanged
    fn alias(&self, anonymous_id: &str, known_id: &str) -> anyhow::Result<()>;
}

/// Reports a visitor's pending assignments
///
/// Assignments are reported in creation order. Reporting stops at the first
/// failure; that assignment and everything after it stay pending.
#[derive(Debug)]
pub struct UnsyncedAssignmentsNotifier<'v> {
    distinct_id: &'v str,
    visitor: &'v mut Visitor,
}

impl<'v> UnsyncedAssignmentsNotifier<'v> {
    /// Notifier for `visitor`, tracked under `distinct_id`
    #[inline]
    #[must_use]
    pub fn new(distinct_id: &'v str, visitor: &'v mut Visitor) -> Self {
        Self { distinct_id, visitor }
    }

    /// Report every pending assignment
    ///
    /// Returns how many were reported.
    ///
    /// # Errors
    /// The first failure from `analytics`
    pub fn notify(self, analytics: &dyn AnalyticsClient) -> anyhow::Result<usize> {
        let distinct_id = self.distinct_id;
        self.visitor.sync_unsynced(|assignment| {
            let Some(event) = AssignmentEvent::from_assignment(assignment) else {
                return Ok(());
            };
            analytics.track_assignment(distinct_id, &event)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use splitkit_registry::{Split, SplitRegistry};
    use splitkit_vary::RaisingNotifier;
    use std::sync::Arc;

    fn visitor() -> Visitor {
        let registry = SplitRegistry::new()
            .with_split(Split::new("blue_button", [("true", 0), ("false", 100)]))
            .with_split(Split::new("side_dish", [("soup", 0), ("salad", 100)]));
        Visitor::with_id(
            VisitorId::new("fake_visitor_id"),
            Some(Arc::new(registry)),
            Arc::new(RaisingNotifier),
        )
    }

    #[test]
    fn event_serializes_with_collector_keys() {
        let mut assignment =
            Assignment::new(VisitorId::new("v1"), "time", Some("hammertime".into()));
        assignment.set_context("menu");
        let event = AssignmentEvent::from_assignment(&assignment).unwrap();

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "TTVisitorID": "v1",
                "SplitName": "time",
                "SplitVariant": "hammertime",
                "SplitContext": "menu",
            })
        );
    }

    #[test]
    fn no_event_for_undecided_assignment() {
        let assignment = Assignment::new(VisitorId::new("v1"), "time", None);
        assert!(AssignmentEvent::from_assignment(&assignment).is_none());
    }

    #[test]
    fn notify_reports_in_order_and_clears() {
        let mut visitor = visitor();
        visitor.resolve_variant("blue_button", "menu").unwrap();
        visitor.resolve_variant("side_dish", "menu").unwrap();

        let mut analytics = MockAnalyticsClient::new();
        let mut seq = mockall::Sequence::new();
        analytics
            .expect_track_assignment()
            .withf(|id, event| id == "fake_visitor_id" && event.split_name == "blue_button")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        analytics
            .expect_track_assignment()
            .withf(|id, event| id == "fake_visitor_id" && event.split_name == "side_dish")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let reported = UnsyncedAssignmentsNotifier::new("fake_visitor_id", &mut visitor)
            .notify(&analytics)
            .unwrap();

        assert_eq!(reported, 2);
        assert_eq!(visitor.unsynced_assignments().count(), 0);
    }

    #[test]
    fn notify_stops_at_first_failure() {
        let mut visitor = visitor();
        visitor.resolve_variant("blue_button", "menu").unwrap();
        visitor.resolve_variant("side_dish", "menu").unwrap();

        let mut analytics = MockAnalyticsClient::new();
        analytics
            .expect_track_assignment()
            .with(eq("distinct"), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let err = UnsyncedAssignmentsNotifier::new("distinct", &mut visitor)
            .notify(&analytics)
            .unwrap_err();

        assert_eq!(err.to_string(), "connection refused");
        let pending: Vec<_> = visitor.unsynced_assignments().map(Assignment::split_name).collect();
        assert_eq!(pending, vec!["blue_button", "side_dish"]);
    }
}
