//! In-memory counter store

use crate::store::CounterStore;
use crate::{Admission, CounterKey, CounterRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tollgate_core::{Limit, PeriodBounds, QuotaResult};

/// `DashMap`-backed counter store
///
/// Concurrent calls for the same key serialize on the map's entry guard, so
/// reset-check-increment is atomic per key without any global lock. Never
/// fails.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<CounterKey, CounterRecord>,
}

impl MemoryCounterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create pre-populated with records (snapshot restore)
    pub fn from_records(records: impl IntoIterator<Item = (CounterKey, CounterRecord)>) -> Self {
        Self {
            counters: records.into_iter().collect(),
        }
    }

    /// Number of live counter rows
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether no counter row exists yet
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Copy of every counter row (snapshot export)
    pub fn records(&self) -> Vec<(CounterKey, CounterRecord)> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub(crate) fn admit_sync(
        &self,
        key: &CounterKey,
        period: &PeriodBounds,
        limit: Limit,
    ) -> Admission {
        // Entry guard holds the shard lock for the whole step.
        let mut entry = self
            .counters
            .entry(key.clone())
            .or_insert_with(|| CounterRecord {
                period_start: period.start,
                count: 0,
            });
        let record = entry.value_mut();

        // Lazy rollover: a resetting window whose stored period elapsed
        // adopts the new period before the limit check. Lifetime rows keep
        // their original anchor.
        if period.expires() && record.period_start != period.start {
            record.period_start = period.start;
            record.count = 0;
        }

        if limit.permits(record.count) {
            record.count += 1;
            Admission {
                admitted: true,
                count: record.count,
            }
        } else {
            Admission {
                admitted: false,
                count: record.count,
            }
        }
    }

    pub(crate) fn revoke_sync(&self, key: &CounterKey, period_start: DateTime<Utc>) -> bool {
        match self.counters.get_mut(key) {
            Some(mut entry) if entry.period_start == period_start && entry.count > 0 => {
                entry.count -= 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn peek_sync(&self, key: &CounterKey, period: &PeriodBounds) -> u64 {
        match self.counters.get(key) {
            Some(entry) if period.expires() && entry.period_start != period.start => 0,
            Some(entry) => entry.count,
            None => 0,
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn try_admit(
        &self,
        key: &CounterKey,
        period: &PeriodBounds,
        limit: Limit,
    ) -> QuotaResult<Admission> {
        Ok(self.admit_sync(key, period, limit))
    }

    async fn revoke(&self, key: &CounterKey, period_start: DateTime<Utc>) -> QuotaResult<bool> {
        Ok(self.revoke_sync(key, period_start))
    }

    async fn peek(&self, key: &CounterKey, period: &PeriodBounds) -> QuotaResult<u64> {
        Ok(self.peek_sync(key, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use tollgate_core::{FeatureId, WindowKind};
    use uuid::Uuid;

    fn key() -> CounterKey {
        CounterKey::new(
            Uuid::new_v4(),
            FeatureId::new("coach").unwrap(),
            WindowKind::Daily,
        )
    }

    fn period(start_secs: i64, len_secs: i64) -> PeriodBounds {
        let start = DateTime::UNIX_EPOCH + Duration::seconds(start_secs);
        PeriodBounds {
            start,
            end: Some(start + Duration::seconds(len_secs)),
        }
    }

    fn lifetime(start_secs: i64) -> PeriodBounds {
        PeriodBounds {
            start: DateTime::UNIX_EPOCH + Duration::seconds(start_secs),
            end: None,
        }
    }

    #[tokio::test]
    async fn admits_exactly_limit_then_rejects() {
        let store = MemoryCounterStore::new();
        let key = key();
        let period = period(0, 86_400);

        for expected in 1..=3 {
            let admission = store.try_admit(&key, &period, Limit::Finite(3)).await.unwrap();
            assert!(admission.admitted);
            assert_eq!(admission.count, expected);
        }

        let rejected = store.try_admit(&key, &period, Limit::Finite(3)).await.unwrap();
        assert!(!rejected.admitted);
        assert_eq!(rejected.count, 3);
    }

    #[tokio::test]
    async fn zero_limit_never_admits() {
        let store = MemoryCounterStore::new();
        let admission = store
            .try_admit(&key(), &period(0, 86_400), Limit::Finite(0))
            .await
            .unwrap();
        assert!(!admission.admitted);
        assert_eq!(admission.count, 0);
    }

    #[tokio::test]
    async fn unlimited_admits_and_still_counts() {
        let store = MemoryCounterStore::new();
        let key = key();
        let period = period(0, 86_400);

        for expected in 1..=50 {
            let admission = store.try_admit(&key, &period, Limit::Unlimited).await.unwrap();
            assert!(admission.admitted);
            assert_eq!(admission.count, expected);
        }
    }

    #[tokio::test]
    async fn stale_period_resets_before_checking() {
        let store = MemoryCounterStore::new();
        let key = key();
        let limit = Limit::Finite(2);

        let yesterday = period(0, 86_400);
        assert!(store.try_admit(&key, &yesterday, limit).await.unwrap().admitted);
        assert!(store.try_admit(&key, &yesterday, limit).await.unwrap().admitted);
        assert!(!store.try_admit(&key, &yesterday, limit).await.unwrap().admitted);

        // First touch after the boundary: exhausted counter rolls over and
        // the attempt lands at count 1, not 0.
        let today = period(86_400, 86_400);
        let admission = store.try_admit(&key, &today, limit).await.unwrap();
        assert!(admission.admitted);
        assert_eq!(admission.count, 1);
    }

    #[tokio::test]
    async fn lifetime_rows_never_reset() {
        let store = MemoryCounterStore::new();
        let key = CounterKey::new(
            Uuid::new_v4(),
            FeatureId::new("coach").unwrap(),
            WindowKind::Lifetime,
        );
        let bounds = lifetime(1_000);

        assert!(store.try_admit(&key, &bounds, Limit::Finite(2)).await.unwrap().admitted);
        assert!(store.try_admit(&key, &bounds, Limit::Finite(2)).await.unwrap().admitted);
        let rejected = store.try_admit(&key, &bounds, Limit::Finite(2)).await.unwrap();
        assert!(!rejected.admitted);
        assert_eq!(rejected.count, 2);
    }

    #[tokio::test]
    async fn revoke_undoes_one_admission() {
        let store = MemoryCounterStore::new();
        let key = key();
        let period = period(0, 86_400);

        store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
        store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
        assert!(store.revoke(&key, period.start).await.unwrap());
        assert_eq!(store.peek(&key, &period).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn revoke_skips_mismatched_period_and_empty_counts() {
        let store = MemoryCounterStore::new();
        let key = key();
        let period = period(0, 86_400);

        // No row yet.
        assert!(!store.revoke(&key, period.start).await.unwrap());

        store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();

        // Period advanced since the admission was applied.
        let later = period.end.unwrap();
        assert!(!store.revoke(&key, later).await.unwrap());
        assert_eq!(store.peek(&key, &period).await.unwrap(), 1);

        // Count already zero.
        assert!(store.revoke(&key, period.start).await.unwrap());
        assert!(!store.revoke(&key, period.start).await.unwrap());
    }

    #[tokio::test]
    async fn peek_applies_rollover_view_without_persisting() {
        let store = MemoryCounterStore::new();
        let key = key();
        let yesterday = period(0, 86_400);
        let today = period(86_400, 86_400);

        store.try_admit(&key, &yesterday, Limit::Finite(5)).await.unwrap();
        assert_eq!(store.peek(&key, &today).await.unwrap(), 0);

        // The stored row is untouched: yesterday still reads back.
        assert_eq!(store.peek(&key, &yesterday).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn peek_on_missing_key_is_zero() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.peek(&key(), &period(0, 86_400)).await.unwrap(), 0);
    }

    #[test]
    fn concurrent_attempts_admit_exactly_the_limit() {
        let store = Arc::new(MemoryCounterStore::new());
        let key = key();
        let period = period(0, 86_400);
        let limit = Limit::Finite(100);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(std::thread::spawn(move || {
                let mut admitted = 0u64;
                for _ in 0..25 {
                    if store.admit_sync(&key, &period, limit).admitted {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
        assert_eq!(store.peek_sync(&key, &period), 100);
    }

    #[test]
    fn records_round_trip() {
        let store = MemoryCounterStore::new();
        let key = key();
        let period = period(0, 86_400);
        store.admit_sync(&key, &period, Limit::Finite(5));
        store.admit_sync(&key, &period, Limit::Finite(5));

        let restored = MemoryCounterStore::from_records(store.records());
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.peek_sync(&key, &period), 2);
    }
}
