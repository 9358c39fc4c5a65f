use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::debug;

use super::retention::RetentionPolicy;
use super::snapshot::Snapshot;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    latest: Snapshot,
    history: VecDeque<Snapshot>,
}

impl Inner {
    fn check(&self, capacity: usize) -> Result<(), StoreError> {
        if self.history.len() > capacity {
            return Err(StoreError::InvariantViolation(format!(
                "history holds {} entries, cap is {capacity}",
                self.history.len()
            )));
        }
        let sorted = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp);
        if !sorted {
            return Err(StoreError::InvariantViolation(
                "history is not sorted by timestamp".to_string(),
            ));
        }
        Ok(())
    }
}

/// Latest snapshot plus a bounded, timestamp-ordered history.
///
/// Every read and write goes through one mutex, so readers never see a
/// half-applied record and every returned `Vec` is a stable copy.
#[derive(Debug)]
pub struct SnapshotStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl SnapshotStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn with_policy(policy: &RetentionPolicy) -> Self {
        Self::new(policy.buffer_cap)
    }

    // A panic while holding the lock cannot leave `Inner` half-written:
    // every mutation below completes before anything that can panic.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().history.is_empty()
    }

    /// Stores `snapshot` as the latest value and appends it to the history,
    /// evicting the oldest entries beyond the capacity.
    pub fn record(&self, snapshot: Snapshot) {
        let mut inner = self.lock();

        let timestamp = snapshot.timestamp;
        let position = inner.history.partition_point(|s| s.timestamp <= timestamp);
        if position < inner.history.len() {
            debug!(
                ?timestamp,
                "snapshot older than newest history entry; inserting in order"
            );
        }
        inner.history.insert(position, snapshot.clone());
        inner.latest = snapshot;

        while inner.history.len() > self.capacity {
            inner.history.pop_front();
        }

        debug_assert_eq!(inner.check(self.capacity), Ok(()));
    }

    /// The most recently recorded snapshot, or the empty snapshot.
    pub fn latest(&self) -> Snapshot {
        self.lock().latest.clone()
    }

    pub fn history(&self, window: Duration) -> Vec<Snapshot> {
        self.history_at(window, SystemTime::now())
    }

    /// Entries with `timestamp >= now - window`, oldest first.
    pub fn history_at(&self, window: Duration, now: SystemTime) -> Vec<Snapshot> {
        if window.is_zero() {
            return Vec::new();
        }
        let inner = self.lock();
        let start = match now.checked_sub(window) {
            Some(cutoff) => inner.history.partition_point(|s| s.timestamp < cutoff),
            None => 0,
        };
        inner.history.range(start..).cloned().collect()
    }

    pub fn cleanup(&self, retention: Duration) -> usize {
        self.cleanup_at(retention, SystemTime::now())
    }

    /// Drops entries older than `now - retention`. Returns how many were removed.
    pub fn cleanup_at(&self, retention: Duration, now: SystemTime) -> usize {
        let Some(cutoff) = now.checked_sub(retention) else {
            return 0;
        };
        let mut inner = self.lock();
        let before = inner.history.len();
        while inner
            .history
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            inner.history.pop_front();
        }
        let removed = before - inner.history.len();
        debug!(
            removed,
            remaining = inner.history.len(),
            "retention cleanup finished"
        );
        removed
    }

    pub fn check_invariants(&self) -> Result<(), StoreError> {
        self.lock().check(self.capacity)
    }
}
