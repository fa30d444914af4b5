//! Splitkit Vary
//!
//! Per-variant branching over an [`Assignment`](splitkit_registry::Assignment)
//! with registry-backed misconfiguration detection.
//!
//! # Core Concepts
//!
//! - [`VaryDsl`]: Register one behavior per variant plus a default, then run
//! - [`AbConfiguration`]: Boolean branching over a two-variant split
//! - [`MisconfigurationNotifier`]: Strategy deciding whether mismatches fail
//! - [`NotifierPolicy`]: Picks the strategy for an [`Environment`]
//!
//! # Example
//!
//! ```rust
//! use splitkit_registry::{Assignment, Split, SplitRegistry, VisitorId};
//! use splitkit_vary::{RaisingNotifier, VaryDsl};
//!
//! let registry = SplitRegistry::new()
//!     .with_split(Split::new("side_dish", [("soup", 0), ("salad", 100)]));
//! let mut assignment = Assignment::new(VisitorId::new("v1"), "side_dish", None);
//!
//! let mut dsl = VaryDsl::new(&mut assignment, "menu", Some(&registry), &RaisingNotifier)?;
//! dsl.when(["soup"], || "hot")?;
//! dsl.default("salad", || "cold")?;
//! let outcome = dsl.run()?;
//!
//! assert_eq!(outcome.value, "cold");
//! assert_eq!(assignment.variant(), Some("salad"));
//! # Ok::<(), splitkit_vary::VaryError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod ab;
mod dsl;
mod error;
mod notifier;

pub use ab::{AbConfiguration, DEFAULT_TRUE_VARIANT};
pub use dsl::{VaryDsl, VaryDslBuilder, VaryOutcome};
pub use error::{ConfigError, Misconfiguration, VaryError};
pub use notifier::{
    AlertSink, Environment, LoggingNotifier, MisconfigurationNotifier, NotifierPolicy,
    RaisingNotifier,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
