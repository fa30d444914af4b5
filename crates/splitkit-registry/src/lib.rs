//! Splitkit Registry
//!
//! Split registry snapshots and deterministic weighted variant resolution.
//!
//! # Core Concepts
//!
//! - [`Split`]: A named experiment or feature flag with weighted variants
//! - [`SplitRegistry`]: Immutable snapshot of every split
//! - [`RegistryHandle`]: Process-wide holder swapping whole snapshots
//! - [`AssignmentResolver`]: Pure `(visitor, split, registry) → variant`
//! - [`Assignment`]: One visitor's variant for one split, with sync state
//!
//! # Example
//!
//! ```rust
//! use splitkit_registry::{AssignmentResolver, Split, SplitRegistry};
//!
//! let registry = SplitRegistry::new()
//!     .with_split(Split::new("side_dish", [("soup", 0), ("salad", 100)]));
//!
//! let variant = AssignmentResolver::new()
//!     .resolve("visitor-1", "side_dish", Some(&registry))
//!     .unwrap();
//! assert_eq!(variant.as_deref(), Some("salad"));
//! ```

#![warn(unreachable_pub)]

mod assignment;
mod bucket;
mod error;
mod registry;
mod resolver;
mod split;

pub use assignment::{Assignment, VisitorId};
pub use bucket::{Bucket, BUCKET_COUNT};
pub use error::RegistryError;
pub use registry::{RegistryHandle, RegistryPayload, RegistrySource, SplitRegistry};
pub use resolver::AssignmentResolver;
pub use split::{Split, FULL_WEIGHT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
