//! Bounded log of recent quota-exceeded events
//!
//! UIs poll this instead of holding a broadcast receiver open; a background
//! task drains the engine's bus into the ring buffer.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tollgate_engine::{AdmissionEngine, QuotaExceeded};
use tracing::warn;

/// Default number of events kept for polling
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 128;

/// Fixed-capacity ring of the most recent events
pub struct EventLog {
    buf: Mutex<VecDeque<QuotaExceeded>>,
    capacity: usize,
}

impl EventLog {
    /// Create a log holding up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest at capacity
    pub fn push(&self, event: QuotaExceeded) {
        let mut buf = self.buf.lock();
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(event);
    }

    /// Events in arrival order, oldest first
    pub fn recent(&self) -> Vec<QuotaExceeded> {
        self.buf.lock().iter().cloned().collect()
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    /// Whether no event has been recorded
    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

/// Drain the engine's exceeded-event bus into the log
pub fn spawn_event_collector(engine: &AdmissionEngine, log: Arc<EventLog>) -> JoinHandle<()> {
    let mut rx = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log.push(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event log fell behind, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
