//! Testing utilities for Splitkit workspace
//!
//! Shared fixtures, recording collaborators and log capture.

#![allow(missing_docs)]

use parking_lot::Mutex;
use splitkit_core::{
    AnalyticsClient, AssignmentEvent, ClientConfig, Collaborators, CurrentIdentity, Identifier,
    IdentifierService, Identity, IdentityLookup, RemoteVisitor, SplitClient,
};
use splitkit_registry::{RegistryHandle, Split, SplitRegistry, VisitorId};
use splitkit_vary::RaisingNotifier;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

// ---------------------------------------------------------------------------
// Registry fixtures
// ---------------------------------------------------------------------------

pub fn registry() -> SplitRegistry {
    SplitRegistry::new()
        .with_split(Split::new("blue_button", [("true", 0), ("false", 100)]))
        .with_split(Split::new("side_dish", [("soup", 0), ("salad", 100)]))
        .with_split(Split::new(
            "button_size",
            [("one", 100), ("two", 0), ("three", 0), ("four", 0)],
        ))
        .with_split(Split::new(
            "time",
            [("hammertime", 50), ("clobberin_time", 50)],
        ))
}

pub fn registry_handle() -> Arc<RegistryHandle> {
    Arc::new(RegistryHandle::with_registry(registry()))
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clown {
    pub id: u64,
}

impl Identity for Clown {
    fn identifier(&self) -> Identifier {
        Identifier::new("clown_id", self.id)
    }
}

pub fn clown() -> Clown {
    Clown { id: 1234 }
}

#[derive(Debug, Clone)]
pub struct StaticCurrentIdentity(pub IdentityLookup);

impl StaticCurrentIdentity {
    pub fn found(identity: &dyn Identity) -> Self {
        Self(IdentityLookup::Found(identity.identifier()))
    }

    pub fn absent() -> Self {
        Self(IdentityLookup::Absent)
    }

    pub fn inaccessible() -> Self {
        Self(IdentityLookup::Inaccessible)
    }
}

impl CurrentIdentity for StaticCurrentIdentity {
    fn current(&self, identifier_type: &str) -> IdentityLookup {
        match &self.0 {
            IdentityLookup::Found(identifier) if identifier.identifier_type != identifier_type => {
                IdentityLookup::Absent
            }
            lookup => lookup.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    tracked: Mutex<Vec<(String, AssignmentEvent)>>,
    aliases: Mutex<Vec<(String, String)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingAnalytics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call fails with `message` until cleared
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    pub fn tracked(&self) -> Vec<(String, AssignmentEvent)> {
        self.tracked.lock().clone()
    }

    pub fn tracked_splits(&self) -> Vec<String> {
        self.tracked
            .lock()
            .iter()
            .map(|(_, event)| event.split_name.clone())
            .collect()
    }

    pub fn aliases(&self) -> Vec<(String, String)> {
        self.aliases.lock().clone()
    }

    fn check(&self) -> anyhow::Result<()> {
        match &*self.failure.lock() {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

impl AnalyticsClient for RecordingAnalytics {
    fn track_assignment(&self, distinct_id: &str, event: &AssignmentEvent) -> anyhow::Result<()> {
        self.check()?;
        self.tracked.lock().push((distinct_id.to_string(), event.clone()));
        Ok(())
    }

    fn alias(&self, anonymous_id: &str, known_id: &str) -> anyhow::Result<()> {
        self.check()?;
        self.aliases
            .lock()
            .push((anonymous_id.to_string(), known_id.to_string()));
        Ok(())
    }
}

/// Identifier service backed by an in-memory owner table
///
/// Unknown identifiers are claimed by the linking visitor, or by a fresh
/// visitor when looked up offline.
#[derive(Debug, Default)]
pub struct StaticIdentifierService {
    owners: Mutex<HashMap<Identifier, RemoteVisitor>>,
    links: Mutex<Vec<(VisitorId, Identifier)>>,
    lookups: Mutex<Vec<Identifier>>,
}

impl StaticIdentifierService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_owner(identity: &dyn Identity, owner: RemoteVisitor) -> Arc<Self> {
        let service = Self::default();
        service.owners.lock().insert(identity.identifier(), owner);
        Arc::new(service)
    }

    pub fn links(&self) -> Vec<(VisitorId, Identifier)> {
        self.links.lock().clone()
    }

    pub fn lookups(&self) -> Vec<Identifier> {
        self.lookups.lock().clone()
    }
}

impl IdentifierService for StaticIdentifierService {
    fn link_identifier(
        &self,
        visitor_id: &VisitorId,
        identifier: &Identifier,
    ) -> anyhow::Result<RemoteVisitor> {
        self.links.lock().push((visitor_id.clone(), identifier.clone()));
        let owner = self
            .owners
            .lock()
            .entry(identifier.clone())
            .or_insert_with(|| RemoteVisitor::new(visitor_id.clone()))
            .clone();
        Ok(owner)
    }

    fn visitor_for(&self, identifier: &Identifier) -> anyhow::Result<RemoteVisitor> {
        self.lookups.lock().push(identifier.clone());
        let owner = self
            .owners
            .lock()
            .entry(identifier.clone())
            .or_insert_with(|| RemoteVisitor::new(uuid::Uuid::new_v4().to_string()))
            .clone();
        Ok(owner)
    }
}

pub fn collaborators(
    analytics: Arc<RecordingAnalytics>,
    identifiers: Arc<StaticIdentifierService>,
) -> Collaborators {
    Collaborators {
        registry: Some(Arc::new(registry())),
        notifier: Arc::new(RaisingNotifier),
        analytics,
        identifiers,
    }
}

pub fn client(
    config: ClientConfig,
    analytics: Arc<RecordingAnalytics>,
    identifiers: Arc<StaticIdentifierService>,
) -> SplitClient {
    SplitClient::new(config, registry_handle(), analytics, identifiers)
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

/// `tracing` layer that keeps every event it sees
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

impl<S> Layer<S> for LogCapture
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Run `f` with a subscriber that captures every event on this thread
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, LogCapture) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture)
}
