//! Tollgate Ledger - Usage counter store
//!
//! One counter per (subscriber, feature, window kind) key, holding the
//! canonical start of the period it counts and the usage recorded so far.
//! The store owns all counter mutation:
//!
//! ```text
//!   try_admit | reset-if-stale, check limit, increment - one atomic step
//!   revoke    | compensating decrement for all-or-nothing rollback
//!   peek      | read-only standing, lazy-rollover view, persists nothing
//! ```
//!
//! Rows are created lazily on first attempt and reset lazily on first touch
//! after their period elapses; there is no background sweep.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod snapshot;
pub mod store;

pub use memory::MemoryCounterStore;
pub use snapshot::SnapshotStore;
pub use store::CounterStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tollgate_core::{FeatureId, SubscriberId, WindowKind};

/// Key of one usage counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    /// Subscriber the usage belongs to
    pub subscriber: SubscriberId,
    /// Metered feature being counted
    pub feature: FeatureId,
    /// Window kind scoping the count
    pub window: WindowKind,
}

impl CounterKey {
    /// Build a key
    pub fn new(subscriber: SubscriberId, feature: FeatureId, window: WindowKind) -> Self {
        Self {
            subscriber,
            feature,
            window,
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subscriber, self.feature, self.window)
    }
}

/// Stored state of one usage counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Canonical start of the period the count covers
    pub period_start: DateTime<Utc>,
    /// Admissions recorded in the period
    pub count: u64,
}

/// Outcome of one conditional increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the increment was applied
    pub admitted: bool,
    /// Count after the call (unchanged when rejected)
    pub count: u64,
}
