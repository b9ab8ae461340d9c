//! Admission engine and status reporter

use crate::directory::SubscriberDirectory;
use crate::events::{QuotaEvents, QuotaExceeded};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tollgate_core::{
    Decision, EngineMetrics, FeatureId, FeatureStatus, MetricsSnapshot, QuotaResult, SubscriberId,
    TierId, WindowKind, WindowResolver, WindowStanding,
};
use tollgate_ledger::{Admission, CounterKey, CounterStore};
use tollgate_policy::{PolicyStore, WindowLimits};
use tracing::{debug, warn};

/// What to do when the counter store fails during admission
///
/// Fail-closed propagates the fault and the caller denies; fail-open admits
/// with a warning and marks the decision degraded. Picked per deployment,
/// never guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Deny on storage faults (default)
    #[default]
    FailClosed,
    /// Admit on storage faults, flagged `degraded`
    FailOpen,
}

/// Orchestrates policy lookup, window resolution and atomic admission
pub struct AdmissionEngine {
    policy: Arc<PolicyStore>,
    counters: Arc<dyn CounterStore>,
    directory: Arc<dyn SubscriberDirectory>,
    resolver: WindowResolver,
    failure_policy: FailurePolicy,
    events: QuotaEvents,
    metrics: EngineMetrics,
}

impl AdmissionEngine {
    /// Create an engine with default resolver, fail-closed policy and bus
    pub fn new(
        policy: Arc<PolicyStore>,
        counters: Arc<dyn CounterStore>,
        directory: Arc<dyn SubscriberDirectory>,
    ) -> Self {
        Self {
            policy,
            counters,
            directory,
            resolver: WindowResolver::default(),
            failure_policy: FailurePolicy::default(),
            events: QuotaEvents::default(),
            metrics: EngineMetrics::new(),
        }
    }

    /// Override the window resolver (custom weekly anchor)
    pub fn with_resolver(mut self, resolver: WindowResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Override the storage failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Override the event bus capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = QuotaEvents::new(capacity);
        self
    }

    /// Policy store backing this engine
    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    /// Subscribe to quota-exceeded events
    pub fn subscribe(&self) -> broadcast::Receiver<QuotaExceeded> {
        self.events.subscribe()
    }

    /// Point-in-time copy of the engine counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Attempt one admission: check and, if allowed, record one unit of use
    ///
    /// Evaluates every window kind in the fixed order; admitted only when
    /// all four admit. On the first rejection, already-applied increments
    /// are revoked in reverse order so a refused attempt consumes nothing.
    /// `allowed = false` is a normal outcome, not an error.
    pub async fn attempt(
        &self,
        subscriber: SubscriberId,
        feature: &FeatureId,
        now: DateTime<Utc>,
    ) -> QuotaResult<Decision> {
        self.metrics.record_attempt();
        match self.admit(subscriber, feature, now).await {
            Ok(decision) => Ok(decision),
            Err(e) => {
                self.metrics.record_error();
                Err(e)
            }
        }
    }

    async fn admit(
        &self,
        subscriber: SubscriberId,
        feature: &FeatureId,
        now: DateTime<Utc>,
    ) -> QuotaResult<Decision> {
        let (tier, created_at) = self.profile(&subscriber).await?;
        let limits = self.policy.limits_for(&tier, feature)?;

        let mut degraded = false;
        let mut windows = Vec::with_capacity(WindowKind::EVALUATION_ORDER.len());
        let mut applied: Vec<(CounterKey, DateTime<Utc>)> = Vec::new();

        for kind in WindowKind::EVALUATION_ORDER {
            let period = self.resolver.resolve(kind, now, created_at);
            let limit = limits.effective(kind);
            let key = CounterKey::new(subscriber, feature.clone(), kind);

            match self.counters.try_admit(&key, &period, limit).await {
                Ok(Admission {
                    admitted: true,
                    count,
                }) => {
                    applied.push((key, period.start));
                    windows.push(WindowStanding {
                        window: kind,
                        limit,
                        count,
                        reset_at: period.end,
                    });
                }
                Ok(Admission {
                    admitted: false,
                    count,
                }) => {
                    self.metrics.record_rejected();
                    self.roll_back(&applied).await;
                    debug!("quota exceeded: {key} at {count}/{limit}");
                    self.events.publish(QuotaExceeded {
                        subscriber,
                        feature: feature.clone(),
                        window: kind,
                        limit,
                        count,
                        reset_at: period.end,
                        at: now,
                    });
                    // Standings re-read after rollback so the decision shows
                    // what the refused attempt left behind.
                    let windows = self
                        .standings(subscriber, feature, &limits, created_at, now)
                        .await?;
                    return Ok(Decision {
                        allowed: false,
                        degraded,
                        windows,
                    });
                }
                Err(e) => {
                    self.metrics.record_persistence_failure();
                    match self.failure_policy {
                        FailurePolicy::FailClosed => {
                            self.roll_back(&applied).await;
                            return Err(e);
                        }
                        FailurePolicy::FailOpen => {
                            warn!("counter store down for {key}, admitting open: {e}");
                            degraded = true;
                            windows.push(WindowStanding {
                                window: kind,
                                limit,
                                count: 0,
                                reset_at: period.end,
                            });
                        }
                    }
                }
            }
        }

        if degraded {
            self.metrics.record_degraded_admit();
        }
        self.metrics.record_admitted();
        Ok(Decision {
            allowed: true,
            degraded,
            windows,
        })
    }

    /// Remaining allowance for one feature, without consuming anything
    pub async fn status(
        &self,
        subscriber: SubscriberId,
        feature: &FeatureId,
        now: DateTime<Utc>,
    ) -> QuotaResult<FeatureStatus> {
        let (tier, created_at) = self.profile(&subscriber).await?;
        let limits = self.policy.limits_for(&tier, feature)?;
        Ok(FeatureStatus {
            feature: feature.clone(),
            windows: self
                .standings(subscriber, feature, &limits, created_at, now)
                .await?,
        })
    }

    /// Status of every cataloged feature, for dashboard rendering
    pub async fn status_all(
        &self,
        subscriber: SubscriberId,
        now: DateTime<Utc>,
    ) -> QuotaResult<Vec<FeatureStatus>> {
        let (tier, created_at) = self.profile(&subscriber).await?;
        // One table snapshot so the catalog and its limits share a version
        // even if a reload lands mid-walk.
        let table = self.policy.table();
        let mut statuses = Vec::new();
        for feature in table.features().cloned() {
            let limits = table.limits_for(&tier, &feature)?;
            statuses.push(FeatureStatus {
                windows: self
                    .standings(subscriber, &feature, &limits, created_at, now)
                    .await?,
                feature,
            });
        }
        Ok(statuses)
    }

    async fn profile(&self, subscriber: &SubscriberId) -> QuotaResult<(TierId, DateTime<Utc>)> {
        let tier = self.directory.tier(subscriber).await?;
        let created_at = self.directory.created_at(subscriber).await?;
        Ok((tier, created_at))
    }

    async fn standings(
        &self,
        subscriber: SubscriberId,
        feature: &FeatureId,
        limits: &WindowLimits,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> QuotaResult<Vec<WindowStanding>> {
        let mut windows = Vec::with_capacity(WindowKind::EVALUATION_ORDER.len());
        for kind in WindowKind::EVALUATION_ORDER {
            let period = self.resolver.resolve(kind, now, created_at);
            let key = CounterKey::new(subscriber, feature.clone(), kind);
            let count = self.counters.peek(&key, &period).await?;
            windows.push(WindowStanding {
                window: kind,
                limit: limits.effective(kind),
                count,
                reset_at: period.end,
            });
        }
        Ok(windows)
    }

    async fn roll_back(&self, applied: &[(CounterKey, DateTime<Utc>)]) {
        for (key, period_start) in applied.iter().rev() {
            match self.counters.revoke(key, *period_start).await {
                Ok(true) => self.metrics.record_rollback(),
                Ok(false) => {
                    self.metrics.record_rollback_failure();
                    warn!("rollback skipped for {key}: period advanced or count empty");
                }
                Err(e) => {
                    self.metrics.record_rollback_failure();
                    warn!("rollback failed for {key}: {e}");
                }
            }
        }
    }
}
