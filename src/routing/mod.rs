//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path
//!     → manifest.rs (exact redirect / alias lookup)
//!     → matcher.rs (prefix sets: gated, public, role lists)
//!     → policy.rs (role → Allow / Redirect / Deny)
//! ```
//!
//! # Design Decisions
//! - Compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same decision

pub mod manifest;
pub mod matcher;
pub mod policy;

pub use manifest::{Manifest, ManifestError, ManifestRoute, Resolution};
pub use matcher::{PathPrefixMatcher, PrefixSet};
pub use policy::{Access, RoutePolicy};
