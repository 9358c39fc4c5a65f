use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hostwatch::metrics::{Snapshot, SnapshotStore};
use proptest::prelude::*;

fn at(secs: u64, id: u64) -> Snapshot {
    Snapshot {
        timestamp: UNIX_EPOCH + Duration::from_secs(secs),
        uptime_seconds: id,
        ..Snapshot::default()
    }
}

fn secs(snapshot: &Snapshot) -> u64 {
    snapshot
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Reference model: stable ordered insert, then drop the oldest over cap.
fn model(timestamps: &[u64], cap: usize) -> Vec<(u64, u64)> {
    let mut entries: Vec<(u64, u64)> = Vec::new();
    for (id, &ts) in timestamps.iter().enumerate() {
        let pos = entries.partition_point(|&(t, _)| t <= ts);
        entries.insert(pos, (ts, id as u64));
        while entries.len() > cap {
            entries.remove(0);
        }
    }
    entries
}

fn record_all(timestamps: &[u64], cap: usize) -> SnapshotStore {
    let store = SnapshotStore::new(cap);
    for (id, &ts) in timestamps.iter().enumerate() {
        store.record(at(ts, id as u64));
    }
    store
}

fn now_at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

proptest! {
    #[test]
    fn history_never_exceeds_cap_and_stays_sorted(
        timestamps in prop::collection::vec(0u64..1_000, 0..200),
        cap in 1usize..50,
    ) {
        let store = record_all(&timestamps, cap);
        prop_assert!(store.len() <= cap);
        prop_assert_eq!(store.check_invariants(), Ok(()));

        let everything = store.history_at(Duration::from_secs(u64::MAX / 4), now_at(2_000));
        let got: Vec<(u64, u64)> = everything.iter().map(|s| (secs(s), s.uptime_seconds)).collect();
        prop_assert_eq!(got, model(&timestamps, cap));
    }

    #[test]
    fn latest_is_last_recorded_regardless_of_order(
        timestamps in prop::collection::vec(0u64..1_000, 1..100),
        cap in 1usize..20,
    ) {
        let store = record_all(&timestamps, cap);
        let latest = store.latest();
        prop_assert_eq!(latest.uptime_seconds, timestamps.len() as u64 - 1);
        prop_assert_eq!(secs(&latest), *timestamps.last().unwrap());
    }

    #[test]
    fn history_window_is_an_inclusive_suffix(
        timestamps in prop::collection::vec(0u64..1_000, 0..100),
        window in 1u64..1_200,
        now in 0u64..1_200,
    ) {
        let store = record_all(&timestamps, 1_000);
        let history = store.history_at(Duration::from_secs(window), now_at(now));
        let cutoff = now.saturating_sub(window);

        prop_assert!(history.iter().all(|s| secs(s) >= cutoff));
        let expected = timestamps.iter().filter(|&&t| t >= cutoff).count();
        prop_assert_eq!(history.len(), expected);
    }

    #[test]
    fn cleanup_removes_exactly_the_expired_prefix(
        timestamps in prop::collection::vec(0u64..1_000, 0..100),
        retention in 1u64..1_000,
    ) {
        let store = record_all(&timestamps, 1_000);
        let latest_before = store.latest();
        let now = 1_000;
        let cutoff = now - retention.min(now);

        let removed = store.cleanup_at(Duration::from_secs(retention), now_at(now));
        let expired = timestamps.iter().filter(|&&t| t < cutoff).count();
        prop_assert_eq!(removed, expired);
        prop_assert_eq!(store.len(), timestamps.len() - expired);
        prop_assert_eq!(store.latest(), latest_before);
        prop_assert_eq!(store.check_invariants(), Ok(()));
    }

    #[test]
    fn zero_window_is_always_empty(
        timestamps in prop::collection::vec(0u64..1_000, 0..50),
    ) {
        let store = record_all(&timestamps, 64);
        prop_assert!(store.history_at(Duration::ZERO, now_at(500)).is_empty());
    }
}
