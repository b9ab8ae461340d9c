//! Tollgate Engine - Admission orchestration
//!
//! Ties the pieces together:
//!
//! ```text
//!   attempt(subscriber, feature, now)
//!       |
//!       v
//!   [subscriber directory]  tier + account creation
//!       |
//!   [policy store]          limits for (tier, feature)
//!       |
//!   [window resolver]       period bounds x 4 window kinds
//!       |
//!   [counter store]         atomic admit per window, all-or-nothing
//!       |
//!       v
//!   Decision { allowed, windows }
//! ```
//!
//! `status` is the non-mutating sibling: same computation over the read-only
//! peek path, so dashboards never consume quota by being rendered. Rejected
//! attempts are published on a broadcast bus for upgrade-prompt UIs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod engine;
pub mod events;

pub use directory::*;
pub use engine::*;
pub use events::*;
