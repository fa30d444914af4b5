//! Visitors and their assignments
//!
//! A [`Visitor`] caches one [`Assignment`] per split for its lifetime and
//! keeps the names of splits whose assignment still has to be reported, in
//! the order they were created.

use crate::identifier::RemoteVisitor;
use splitkit_registry::{Assignment, AssignmentResolver, RegistryError, SplitRegistry, VisitorId};
use splitkit_vary::{AbConfiguration, MisconfigurationNotifier, VaryDsl, VaryError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Visitor identity plus its assignments
pub struct Visitor {
    id: VisitorId,
    assignments: HashMap<String, Assignment>,
    unsynced: Vec<String>,
    registry: Option<Arc<SplitRegistry>>,
    notifier: Arc<dyn MisconfigurationNotifier>,
    resolver: AssignmentResolver,
}

impl Visitor {
    /// Create visitor with a fresh random id
    #[must_use]
    pub fn new(
        registry: Option<Arc<SplitRegistry>>,
        notifier: Arc<dyn MisconfigurationNotifier>,
    ) -> Self {
        Self::with_id(VisitorId::new(Uuid::new_v4().to_string()), registry, notifier)
    }

    /// Create visitor reusing an existing id
    #[must_use]
    pub fn with_id(
        id: VisitorId,
        registry: Option<Arc<SplitRegistry>>,
        notifier: Arc<dyn MisconfigurationNotifier>,
    ) -> Self {
        Self {
            id,
            assignments: HashMap::new(),
            unsynced: Vec::new(),
            registry,
            notifier,
            resolver: AssignmentResolver::new(),
        }
    }

    /// Visitor id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &VisitorId {
        &self.id
    }

    /// Registry snapshot this visitor resolves against
    #[inline]
    #[must_use]
    pub fn registry(&self) -> Option<&SplitRegistry> {
        self.registry.as_deref()
    }

    /// Cached assignment for a split
    #[inline]
    #[must_use]
    pub fn assignment(&self, split_name: &str) -> Option<&Assignment> {
        self.assignments.get(split_name)
    }

    /// Every cached assignment
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    /// Assignment for `split_name`, resolving and caching it on first use
    ///
    /// A new assignment is pending report. `context` labels the call site.
    ///
    /// # Errors
    /// `RegistryError` if a loaded registry cannot resolve the split
    pub fn assignment_for(
        &mut self,
        split_name: &str,
        context: &str,
    ) -> Result<&mut Assignment, RegistryError> {
        if !self.assignments.contains_key(split_name) {
            let variant = self
                .resolver
                .resolve(self.id.as_str(), split_name, self.registry.as_deref())?;
            tracing::debug!(
                visitor_id = %self.id,
                split = split_name,
                variant = variant.as_deref(),
                "assignment created"
            );
            self.assignments.insert(
                split_name.to_string(),
                Assignment::new(self.id.clone(), split_name, variant),
            );
            self.unsynced.push(split_name.to_string());
        }

        let assignment = self
            .assignments
            .get_mut(split_name)
            .ok_or_else(|| RegistryError::UnknownSplit(split_name.to_string()))?;
        assignment.set_context(context);
        Ok(assignment)
    }

    /// Variant for `split_name`, `None` while the registry is absent
    ///
    /// # Errors
    /// `RegistryError` if a loaded registry cannot resolve the split
    pub fn resolve_variant(
        &mut self,
        split_name: &str,
        context: &str,
    ) -> Result<Option<String>, RegistryError> {
        Ok(self
            .assignment_for(split_name, context)?
            .variant()
            .map(str::to_string))
    }

    /// Branch on `split_name`
    ///
    /// `configure` registers behaviors; the matching one runs and its value is
    /// returned. A variant decided by the default branch is queued for report.
    ///
    /// # Errors
    /// Anything resolution or [`VaryDsl`] reports
    pub fn vary<'f, R, F>(
        &mut self,
        split_name: &str,
        context: &str,
        configure: F,
    ) -> Result<R, VaryError>
    where
        F: for<'a> FnOnce(&mut VaryDsl<'a, 'f, R>) -> Result<(), VaryError>,
    {
        let registry = self.registry.clone();
        let notifier = Arc::clone(&self.notifier);

        let assignment = self.assignment_for(split_name, context)?;
        let mut dsl = VaryDsl::new(assignment, context, registry.as_deref(), notifier.as_ref())?;
        configure(&mut dsl)?;
        let outcome = dsl.run()?;

        if outcome.decided {
            self.requeue(split_name);
        }
        Ok(outcome.value)
    }

    /// Boolean branch on `split_name`
    ///
    /// # Errors
    /// Anything resolution or [`AbConfiguration`] reports
    pub fn ab(
        &mut self,
        split_name: &str,
        context: &str,
        true_variant: Option<&str>,
    ) -> Result<bool, VaryError> {
        let registry = self.registry.clone();
        let notifier = Arc::clone(&self.notifier);

        let config =
            AbConfiguration::new(split_name, true_variant, registry.as_deref(), notifier.as_ref())?;
        let assignment = self.assignment_for(split_name, context)?;
        let outcome = config.run(assignment, context, registry.as_deref(), notifier.as_ref())?;

        if outcome.decided {
            self.requeue(split_name);
        }
        Ok(outcome.value)
    }

    /// Pending assignments in creation order, resolved or not
    pub fn unsynced_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.unsynced
            .iter()
            .filter_map(|split| self.assignments.get(split))
            .filter(|assignment| assignment.is_unsynced())
    }

    /// Whether anything resolved is waiting to be reported
    #[must_use]
    pub fn has_unsynced(&self) -> bool {
        self.unsynced_assignments().any(Assignment::is_resolved)
    }

    /// Hand each resolved pending assignment to `report`, in creation order
    ///
    /// Reported assignments are marked synced. On the first failure the
    /// remaining assignments stay pending and the failure is returned.
    /// Undecided assignments are kept for a later round.
    ///
    /// # Errors
    /// The first error returned by `report`
    pub fn sync_unsynced<F>(&mut self, mut report: F) -> anyhow::Result<usize>
    where
        F: FnMut(&Assignment) -> anyhow::Result<()>,
    {
        let pending = std::mem::take(&mut self.unsynced);
        let mut remaining = Vec::new();
        let mut failure = None;
        let mut reported = 0;

        for split in pending {
            let Some(assignment) = self.assignments.get_mut(&split) else {
                continue;
            };
            if !assignment.is_unsynced() {
                continue;
            }
            if failure.is_some() || !assignment.is_resolved() {
                remaining.push(split);
                continue;
            }
            match report(assignment) {
                Ok(()) => {
                    assignment.mark_synced();
                    reported += 1;
                }
                Err(err) => {
                    failure = Some(err);
                    remaining.push(split);
                }
            }
        }

        self.unsynced = remaining;
        match failure {
            Some(err) => Err(err),
            None => Ok(reported),
        }
    }

    /// Fold a remote visitor into this one
    ///
    /// The remote id is adopted. Remote assignments win over local ones for
    /// the same split, and a local pending report for such a split is dropped.
    pub fn merge(&mut self, remote: RemoteVisitor) {
        let RemoteVisitor { id, assignments } = remote;

        for (split, variant) in assignments {
            if let Some(local) = self.assignments.get(&split) {
                if local.variant() != Some(variant.as_str()) {
                    tracing::warn!(
                        split = split.as_str(),
                        local = local.variant(),
                        remote = variant.as_str(),
                        "remote assignment overrides local assignment"
                    );
                }
            }
            self.unsynced.retain(|pending| *pending != split);
            let assignment = Assignment::synced(id.clone(), split.as_str(), variant);
            self.assignments.insert(split, assignment);
        }

        for assignment in self.assignments.values_mut() {
            assignment.rebind(id.clone());
        }
        if id != self.id {
            tracing::debug!(from = %self.id, to = %id, "visitor merged");
        }
        self.id = id;
    }

    fn requeue(&mut self, split_name: &str) {
        if let Some(assignment) = self.assignments.get_mut(split_name) {
            assignment.mark_unsynced();
            if !self.unsynced.iter().any(|pending| pending == split_name) {
                self.unsynced.push(split_name.to_string());
            }
        }
    }
}

impl fmt::Debug for Visitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visitor")
            .field("id", &self.id)
            .field("assignments", &self.assignments)
            .field("unsynced", &self.unsynced)
            .field("registry_loaded", &self.registry.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use splitkit_registry::Split;
    use splitkit_vary::{LoggingNotifier, RaisingNotifier};

    fn registry() -> Arc<SplitRegistry> {
        Arc::new(
            SplitRegistry::new()
                .with_split(Split::new("blue_button", [("true", 0), ("false", 100)]))
                .with_split(Split::new("side_dish", [("soup", 0), ("salad", 100)]))
                .with_split(Split::new(
                    "button_size",
                    [("one", 100), ("two", 0), ("three", 0), ("four", 0)],
                )),
        )
    }

    fn visitor(registry: Option<Arc<SplitRegistry>>) -> Visitor {
        Visitor::with_id(VisitorId::new("fake_visitor_id"), registry, Arc::new(RaisingNotifier))
    }

    fn pending(visitor: &Visitor) -> Vec<(String, Option<String>)> {
        visitor
            .unsynced_assignments()
            .map(|a| (a.split_name().to_string(), a.variant().map(str::to_string)))
            .collect()
    }

    #[test]
    fn new_visitor_gets_uuid() {
        let a = Visitor::new(None, Arc::new(RaisingNotifier));
        let b = Visitor::new(None, Arc::new(RaisingNotifier));
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id().as_str()).is_ok());
    }

    #[test]
    fn assignment_for_caches_and_queues_once() {
        let mut visitor = visitor(Some(registry()));
        assert_eq!(visitor.resolve_variant("side_dish", "menu").unwrap().as_deref(), Some("salad"));
        assert_eq!(visitor.resolve_variant("side_dish", "menu").unwrap().as_deref(), Some("salad"));

        assert_eq!(pending(&visitor), vec![("side_dish".to_string(), Some("salad".to_string()))]);
        assert_eq!(visitor.assignment("side_dish").and_then(Assignment::context), Some("menu"));
    }

    #[test]
    fn assignment_for_unknown_split_fails_with_registry() {
        let mut visitor = visitor(Some(registry()));
        let err = visitor.resolve_variant("not_a_real_split", "ctx").unwrap_err();
        assert_eq!(err.to_string(), "unknown split: not_a_real_split");
        assert!(visitor.assignment("not_a_real_split").is_none());
    }

    #[test]
    fn absent_registry_leaves_variant_undecided() {
        let mut visitor = visitor(None);
        assert_eq!(visitor.resolve_variant("anything", "ctx").unwrap(), None);
        assert!(!visitor.has_unsynced());
    }

    #[test]
    fn vary_runs_resolved_branch() {
        let mut visitor = visitor(Some(registry()));
        let size = visitor
            .vary("button_size", "header", |v| {
                v.when(["one"], || 1)?;
                v.when(["two", "three"], || 2)?;
                v.default("four", || 4)?;
                Ok(())
            })
            .unwrap();
        assert_eq!(size, 1);
    }

    #[test]
    fn vary_default_decides_and_requeues() {
        let mut visitor = visitor(None);
        visitor.resolve_variant("button_size", "ctx").unwrap();
        visitor.sync_unsynced(|_| Ok(())).unwrap();

        let value = visitor
            .vary("button_size", "ctx", |v| {
                v.when(["one"], || "one")?;
                v.default("two", || "two")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(value, "two");
        assert_eq!(pending(&visitor), vec![("button_size".to_string(), Some("two".to_string()))]);
    }

    #[test]
    fn vary_reports_misconfiguration_through_notifier() {
        let mut visitor = visitor(Some(registry()));
        let err = visitor
            .vary("button_size", "ctx", |v| {
                v.when(["one"], || ())?;
                v.default("two", || ())?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "vary for \"button_size\" does not configure variants three and four"
        );
    }

    #[test]
    fn vary_keeps_running_with_logging_notifier() {
        let mut visitor = Visitor::with_id(
            VisitorId::new("fake_visitor_id"),
            Some(registry()),
            Arc::new(LoggingNotifier::new()),
        );
        let value = visitor
            .vary("button_size", "ctx", |v| {
                v.when(["one"], || "one")?;
                v.default("two", || "two")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(value, "one");
    }

    #[test]
    fn ab_uses_split_variants() {
        let mut visitor = visitor(Some(registry()));
        assert!(!visitor.ab("blue_button", "ctx", None).unwrap());
        assert!(!visitor.ab("side_dish", "ctx", Some("soup")).unwrap());
        assert!(visitor.ab("side_dish", "ctx", Some("salad")).unwrap());
    }

    #[test]
    fn sync_skips_undecided_assignments() {
        let mut visitor = visitor(None);
        visitor.resolve_variant("button_size", "ctx").unwrap();

        let reported = visitor.sync_unsynced(|_| Ok(())).unwrap();
        assert_eq!(reported, 0);
        assert_eq!(pending(&visitor), vec![("button_size".to_string(), None)]);
    }

    #[test]
    fn merge_prefers_remote_assignments() {
        let mut visitor = visitor(Some(registry()));
        visitor.resolve_variant("side_dish", "ctx").unwrap();
        visitor.resolve_variant("blue_button", "ctx").unwrap();

        visitor.merge(RemoteVisitor::new("remote_id").with_assignment("side_dish", "soup"));

        assert_eq!(visitor.id().as_str(), "remote_id");
        let side_dish = visitor.assignment("side_dish").unwrap();
        assert_eq!(side_dish.variant(), Some("soup"));
        assert!(!side_dish.is_unsynced());
        assert_eq!(pending(&visitor), vec![("blue_button".to_string(), Some("false".to_string()))]);
        assert!(visitor.assignments().all(|a| a.visitor_id().as_str() == "remote_id"));
    }
}
