//! Counter store seam

use crate::{Admission, CounterKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tollgate_core::{Limit, PeriodBounds, QuotaResult};

/// Persistence abstraction for usage counters
///
/// Implementations must serialize concurrent calls per key: under any
/// interleaving of `try_admit` calls for the same key and a finite limit L,
/// exactly L calls are admitted before the count reaches L.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Conditionally record one admission
    ///
    /// If the stored period is stale for a resetting window, the count is
    /// reset and the new period adopted before the limit check; reset, check
    /// and increment happen as one atomic step. An unlimited limit always
    /// admits and still increments.
    async fn try_admit(
        &self,
        key: &CounterKey,
        period: &PeriodBounds,
        limit: Limit,
    ) -> QuotaResult<Admission>;

    /// Compensating decrement for an admission being rolled back
    ///
    /// Decrements only while the stored period still matches `period_start`
    /// and the count is positive. Returns `Ok(false)` when nothing matched;
    /// the caller records the anomaly, never retries into a wedge.
    async fn revoke(&self, key: &CounterKey, period_start: DateTime<Utc>) -> QuotaResult<bool>;

    /// Read-only count for the period, applying the lazy-rollover view
    ///
    /// An elapsed stored period reads as 0 without persisting anything.
    async fn peek(&self, key: &CounterKey, period: &PeriodBounds) -> QuotaResult<u64>;
}
