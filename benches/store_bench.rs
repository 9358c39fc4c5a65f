use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hostwatch::metrics::snapshot::ProcessInfo;
use hostwatch::metrics::{Snapshot, SnapshotStore};
use std::hint::black_box;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn make_snapshot(secs: u64, processes: usize) -> Snapshot {
    Snapshot {
        timestamp: UNIX_EPOCH + Duration::from_secs(secs),
        processes: (0..processes)
            .map(|i| ProcessInfo {
                pid: i as u32 + 1,
                name: format!("proc_{i}"),
                memory_bytes: (i as u64 + 1) * 1024,
                cpu_percent: (i % 100) as f32,
                ..ProcessInfo::default()
            })
            .collect(),
        total_processes: processes as u32,
        ..Snapshot::default()
    }
}

fn filled_store(cap: usize, processes: usize) -> SnapshotStore {
    let store = SnapshotStore::new(cap);
    for secs in 0..cap as u64 {
        store.record(make_snapshot(secs, processes));
    }
    store
}

fn bench_record_at_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_at_capacity");

    for cap in [100usize, 1000, 5000] {
        let store = filled_store(cap, 50);
        let snapshot = make_snapshot(cap as u64, 50);
        group.bench_with_input(BenchmarkId::from_parameter(cap), &snapshot, |b, snapshot| {
            b.iter(|| store.record(black_box(snapshot.clone())))
        });
    }

    group.finish();
}

fn bench_history_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_window_1000");
    let store = filled_store(1000, 50);
    let now: SystemTime = UNIX_EPOCH + Duration::from_secs(1000);

    for window in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, &window| {
            b.iter(|| {
                let history = store.history_at(black_box(Duration::from_secs(window)), now);
                black_box(history);
            })
        });
    }

    group.finish();
}

fn bench_latest(c: &mut Criterion) {
    let store = filled_store(1000, 200);
    c.bench_function("latest_200_processes", |b| b.iter(|| black_box(store.latest())));
}

criterion_group!(
    benches,
    bench_record_at_capacity,
    bench_history_window,
    bench_latest
);
criterion_main!(benches);
