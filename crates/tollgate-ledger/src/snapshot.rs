//! Snapshot persistence for the counter store
//!
//! Decorates [`MemoryCounterStore`] with a durable JSON snapshot: restored
//! on startup, rewritten periodically by a background task and once more on
//! shutdown. Admission latency never blocks on disk; the flush runs off the
//! admission path and writes temp-then-rename so a crash mid-write leaves
//! the previous snapshot intact.

use crate::memory::MemoryCounterStore;
use crate::store::CounterStore;
use crate::{Admission, CounterKey, CounterRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tollgate_core::{FeatureId, Limit, PeriodBounds, QuotaError, QuotaResult, SubscriberId, WindowKind};
use tracing::{info, warn};

/// Counter store with periodic durable flush
#[derive(Debug)]
pub struct SnapshotStore {
    inner: MemoryCounterStore,
    path: PathBuf,
    dirty: AtomicBool,
}

impl SnapshotStore {
    /// Open the store, restoring counters from an existing snapshot
    ///
    /// A missing file starts empty; an unreadable or corrupt file is a
    /// persistence failure (silently zeroing counters would grant quota).
    pub fn open(path: impl Into<PathBuf>) -> QuotaResult<Self> {
        let path = path.into();
        let inner = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let file: SnapshotFile = serde_json::from_str(&text)
                    .map_err(|e| QuotaError::Persistence(format!("{}: {e}", path.display())))?;
                info!(
                    "restored {} usage counters from {}",
                    file.counters.len(),
                    path.display()
                );
                MemoryCounterStore::from_records(file.counters.into_iter().map(SnapshotRow::into_record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryCounterStore::new(),
            Err(e) => {
                return Err(QuotaError::Persistence(format!("{}: {e}", path.display())));
            }
        };
        Ok(Self {
            inner,
            path,
            dirty: AtomicBool::new(false),
        })
    }

    /// Number of live counter rows
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no counter row exists yet
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Write the snapshot if any counter changed since the last flush
    pub fn flush(&self) -> QuotaResult<()> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.write_snapshot() {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    /// Periodically flush from a background task
    pub fn spawn_flusher(store: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = store.flush() {
                    warn!("usage snapshot flush failed: {e}");
                }
            }
        })
    }

    fn write_snapshot(&self) -> QuotaResult<()> {
        let file = SnapshotFile {
            saved_at: Utc::now(),
            counters: self
                .inner
                .records()
                .into_iter()
                .map(SnapshotRow::from_record)
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| QuotaError::Persistence(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| QuotaError::Persistence(format!("{}: {e}", parent.display())))?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| QuotaError::Persistence(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| QuotaError::Persistence(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for SnapshotStore {
    async fn try_admit(
        &self,
        key: &CounterKey,
        period: &PeriodBounds,
        limit: Limit,
    ) -> QuotaResult<Admission> {
        // A rejected attempt can still roll a stale period over, so every
        // call marks the snapshot dirty.
        let admission = self.inner.admit_sync(key, period, limit);
        self.dirty.store(true, Ordering::Release);
        Ok(admission)
    }

    async fn revoke(&self, key: &CounterKey, period_start: DateTime<Utc>) -> QuotaResult<bool> {
        let applied = self.inner.revoke_sync(key, period_start);
        if applied {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(applied)
    }

    async fn peek(&self, key: &CounterKey, period: &PeriodBounds) -> QuotaResult<u64> {
        Ok(self.inner.peek_sync(key, period))
    }
}

/// On-disk snapshot layout: one row per counter
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    saved_at: DateTime<Utc>,
    counters: Vec<SnapshotRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    subscriber_id: SubscriberId,
    feature: FeatureId,
    window_kind: WindowKind,
    period_start: DateTime<Utc>,
    count: u64,
}

impl SnapshotRow {
    fn from_record((key, record): (CounterKey, CounterRecord)) -> Self {
        Self {
            subscriber_id: key.subscriber,
            feature: key.feature,
            window_kind: key.window,
            period_start: record.period_start,
            count: record.count,
        }
    }

    fn into_record(self) -> (CounterKey, CounterRecord) {
        (
            CounterKey::new(self.subscriber_id, self.feature, self.window_kind),
            CounterRecord {
                period_start: self.period_start,
                count: self.count,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("tollgate-snap-{}.json", Uuid::new_v4()))
    }

    fn key() -> CounterKey {
        CounterKey::new(
            Uuid::new_v4(),
            FeatureId::new("coach").unwrap(),
            WindowKind::Daily,
        )
    }

    fn period() -> PeriodBounds {
        let start = DateTime::UNIX_EPOCH + Duration::days(20_000);
        PeriodBounds {
            start,
            end: Some(start + Duration::days(1)),
        }
    }

    #[tokio::test]
    async fn counters_survive_reopen() {
        let path = temp_path();
        let key = key();
        let period = period();

        {
            let store = SnapshotStore::open(&path).unwrap();
            store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
            store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
            store.flush().unwrap();
        }

        let reopened = SnapshotStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.peek(&key, &period).await.unwrap(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn clean_store_writes_nothing() {
        let path = temp_path();
        let store = SnapshotStore::open(&path).unwrap();
        store.flush().unwrap();
        assert!(!path.exists());

        store.try_admit(&key(), &period(), Limit::Finite(1)).await.unwrap();
        store.flush().unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        // Flushed and unchanged since: second flush is a no-op.
        let saved = std::fs::metadata(&path).unwrap().modified().unwrap();
        store.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), saved);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn revoke_is_durable() {
        let path = temp_path();
        let key = key();
        let period = period();

        {
            let store = SnapshotStore::open(&path).unwrap();
            store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
            store.try_admit(&key, &period, Limit::Finite(5)).await.unwrap();
            store.flush().unwrap();
            store.revoke(&key, period.start).await.unwrap();
            store.flush().unwrap();
        }

        let reopened = SnapshotStore::open(&path).unwrap();
        assert_eq!(reopened.peek(&key, &period).await.unwrap(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn corrupt_snapshot_is_a_persistence_failure() {
        let path = temp_path();
        std::fs::write(&path, "{ not json").unwrap();
        let err = SnapshotStore::open(&path).unwrap_err();
        assert!(matches!(err, QuotaError::Persistence(_)));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn background_flusher_persists_without_explicit_flush() {
        let path = temp_path();
        let store = Arc::new(SnapshotStore::open(&path).unwrap());
        let flusher = SnapshotStore::spawn_flusher(Arc::clone(&store), std::time::Duration::from_millis(10));

        store.try_admit(&key(), &period(), Limit::Finite(5)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        assert!(path.exists());
        flusher.abort();
        std::fs::remove_file(&path).ok();
    }
}
