//! Quota-exceeded event bus
//!
//! Rejected attempts are published for whoever cares: upgrade prompts,
//! conversion funnels, operator dashboards. Lagging or absent subscribers
//! never slow admission down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tollgate_core::{FeatureId, Limit, SubscriberId, WindowKind};

/// Default bus capacity before slow subscribers start lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// One rejected admission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaExceeded {
    /// Subscriber whose attempt was rejected
    pub subscriber: SubscriberId,
    /// Feature that was attempted
    pub feature: FeatureId,
    /// Window that rejected the attempt
    pub window: WindowKind,
    /// Limit in force on that window
    pub limit: Limit,
    /// Count standing against the limit
    pub count: u64,
    /// When the binding window resets, `None` for lifetime
    pub reset_at: Option<DateTime<Utc>>,
    /// When the attempt was made
    pub at: DateTime<Utc>,
}

/// Broadcast bus for [`QuotaExceeded`] events
pub struct QuotaEvents {
    tx: broadcast::Sender<QuotaExceeded>,
}

impl QuotaEvents {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to rejected attempts
    pub fn subscribe(&self) -> broadcast::Receiver<QuotaExceeded> {
        self.tx.subscribe()
    }

    /// Publish one event; dropped when nobody is subscribed
    pub fn publish(&self, event: QuotaExceeded) {
        let _ = self.tx.send(event);
    }
}

impl Default for QuotaEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event() -> QuotaExceeded {
        QuotaExceeded {
            subscriber: Uuid::new_v4(),
            feature: FeatureId::new("coach").unwrap(),
            window: WindowKind::Daily,
            limit: Limit::Finite(5),
            count: 5,
            reset_at: Some("2025-03-11T00:00:00Z".parse().unwrap()),
            at: "2025-03-10T12:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = QuotaEvents::default();
        let mut rx = bus.subscribe();

        let sent = event();
        bus.publish(sent.clone());

        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = QuotaEvents::default();
        bus.publish(event());

        // A later subscriber only sees events published after it joined.
        let mut rx = bus.subscribe();
        bus.publish(event());
        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
    }
}
