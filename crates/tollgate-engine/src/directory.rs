//! Subscriber directory seam
//!
//! Identity and billing live outside this system; the engine consumes them
//! through this trait. Tier changes take effect on the next attempt, which
//! is all the downgrade semantics require.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tollgate_core::{QuotaError, QuotaResult, SubscriberId, TierId};

/// External identity view the engine depends on
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Current subscription tier
    async fn tier(&self, subscriber: &SubscriberId) -> QuotaResult<TierId>;

    /// Account-creation instant, the lifetime window's anchor
    async fn created_at(&self, subscriber: &SubscriberId) -> QuotaResult<DateTime<Utc>>;
}

/// What the engine knows about one subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    /// Subscription tier
    pub tier: TierId,
    /// Account-creation instant
    pub created_at: DateTime<Utc>,
}

/// Config-seeded in-memory directory
///
/// Serves single-node deployments and tests. Unknown subscribers fail
/// closed; nothing is ever defaulted.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: RwLock<HashMap<SubscriberId, SubscriberProfile>>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pre-seeded with profiles
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = (SubscriberId, SubscriberProfile)>,
    ) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().collect()),
        }
    }

    /// Insert or replace a subscriber's profile
    pub fn upsert(&self, subscriber: SubscriberId, profile: SubscriberProfile) {
        self.profiles.write().insert(subscriber, profile);
    }

    /// Change a subscriber's tier in place (upgrade or downgrade)
    pub fn set_tier(&self, subscriber: &SubscriberId, tier: TierId) -> QuotaResult<()> {
        match self.profiles.write().get_mut(subscriber) {
            Some(profile) => {
                profile.tier = tier;
                Ok(())
            }
            None => Err(QuotaError::UnknownSubscriber(*subscriber)),
        }
    }

    /// Number of known subscribers
    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

#[async_trait]
impl SubscriberDirectory for StaticDirectory {
    async fn tier(&self, subscriber: &SubscriberId) -> QuotaResult<TierId> {
        self.profiles
            .read()
            .get(subscriber)
            .map(|p| p.tier.clone())
            .ok_or(QuotaError::UnknownSubscriber(*subscriber))
    }

    async fn created_at(&self, subscriber: &SubscriberId) -> QuotaResult<DateTime<Utc>> {
        self.profiles
            .read()
            .get(subscriber)
            .map(|p| p.created_at)
            .ok_or(QuotaError::UnknownSubscriber(*subscriber))
    }
}
