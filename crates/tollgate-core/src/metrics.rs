//! Lock-free admission counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-level counters, safe to bump from any number of tasks
#[derive(Debug)]
pub struct EngineMetrics {
    attempts: AtomicU64,
    admitted: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
    rollbacks: AtomicU64,
    rollback_failures: AtomicU64,
    persistence_failures: AtomicU64,
    degraded_admits: AtomicU64,
}

impl EngineMetrics {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            rollback_failures: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            degraded_admits: AtomicU64::new(0),
        }
    }

    /// Record an admission attempt
    #[inline]
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fully admitted attempt
    #[inline]
    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a quota-exceeded rejection
    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an attempt that failed with an error
    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful compensating decrement
    #[inline]
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a compensating decrement that could not be applied
    #[inline]
    pub fn record_rollback_failure(&self) {
        self.rollback_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a storage fault seen during admission
    #[inline]
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an admission granted despite a storage fault
    #[inline]
    pub fn record_degraded_admit(&self) {
        self.degraded_admits.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of all counters for reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            rollback_failures: self.rollback_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            degraded_admits: self.degraded_admits.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain-data view of [`EngineMetrics`] for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Total admission attempts
    pub attempts: u64,
    /// Attempts admitted across all windows
    pub admitted: u64,
    /// Attempts rejected by an exhausted window
    pub rejected: u64,
    /// Attempts that returned an error
    pub errors: u64,
    /// Compensating decrements applied
    pub rollbacks: u64,
    /// Compensating decrements that could not be applied
    pub rollback_failures: u64,
    /// Storage faults observed during admission
    pub persistence_failures: u64,
    /// Admissions granted under fail-open degradation
    pub degraded_admits: u64,
}
