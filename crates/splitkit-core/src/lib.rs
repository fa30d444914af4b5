//! Splitkit Core
//!
//! Visitors, sessions and identity resolution for split-testing clients:
//! - Resolves and caches one assignment per split per visitor
//! - Batches assignment reports inside a request, reports immediately outside
//! - Links sign-up and log-in identities to visitors
//! - Picks the request or an offline scope for any identity
//!
//! # Example
//!
//! ```rust,ignore
//! use splitkit_core::{ClientConfig, Identifier, SplitClient, WebContext};
//!
//! let client = SplitClient::new(ClientConfig::new(), registry, analytics, identifiers);
//! let mut session = client.online_session(cookie_visitor_id);
//! let mut web = WebContext::new(&mut session, &current_user);
//!
//! let label = client.vary(Some(&mut web), &user, "button_color", "signup_page", |v| {
//!     v.when(["blue"], || "Blue")?;
//!     v.default("red", || "Red")?;
//!     Ok(())
//! })?;
//!
//! session.flush()?;
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod identifier;
pub mod identity;
pub mod session;
pub mod visitor;

// Re-exports for convenience
pub use analytics::{
    AnalyticsClient, AssignmentEvent, UnsyncedAssignmentsNotifier, ASSIGNMENT_EVENT_NAME,
};
pub use client::SplitClient;
pub use config::{ClientConfig, UnmatchedIdentityPolicy};
pub use error::{ClientError, UsageError};
pub use identifier::{Identifier, IdentifierService, RemoteVisitor};
pub use identity::{CurrentIdentity, Identity, IdentityLookup, Scope, WebContext};
pub use session::{
    Collaborators, LogInOptions, OfflineSession, OnlineSession, Session, SyncTiming, VisitorDsl,
};
pub use visitor::Visitor;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Splitkit
    pub use crate::{
        ClientConfig, ClientError, Identifier, Identity, LogInOptions, OnlineSession, Session,
        SplitClient, WebContext,
    };
    pub use splitkit_registry::{RegistryHandle, SplitRegistry, VisitorId};
    pub use splitkit_vary::{Environment, VaryDsl, VaryError};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
