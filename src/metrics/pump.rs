use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, error, info, warn};

use super::collector::Collector;
use super::retention::RetentionPolicy;
use super::snapshot::Snapshot;
use super::store::SnapshotStore;
use crate::error::{CollectionError, PumpError};
use crate::telemetry::ExportSink;

pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Events a cycle span carries between start and end: the snapshot or the
/// error, the outcome, two timings and the overrun flag.
const CYCLE_SPAN_SLOTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpSettings {
    pub refresh_interval: Duration,
    pub collection_timeout: Duration,
}

impl PumpSettings {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            collection_timeout: DEFAULT_COLLECTION_TIMEOUT,
        }
    }

    pub fn with_collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout = timeout;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PumpState {
    Idle,
    Running,
    Stopping,
}

impl PumpState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PumpState::Running,
            2 => PumpState::Stopping,
            _ => PumpState::Idle,
        }
    }
}

/// Lifecycle state shared by the [`Pump`], its collection task and any
/// [`PumpStateHandle`]. `Stopping` covers the window between the shutdown
/// signal (from `stop()` or drop) and the task leaving its loop.
#[derive(Clone, Debug, Default)]
pub struct PumpStateHandle(Arc<AtomicU8>);

impl PumpStateHandle {
    pub fn get(&self) -> PumpState {
        PumpState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: PumpState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Counters updated by the collection task.
#[derive(Debug, Default)]
pub struct PumpStats {
    cycles: AtomicU64,
    collections: AtomicU64,
    failures: AtomicU64,
    overruns: AtomicU64,
    cleanups: AtomicU64,
}

impl PumpStats {
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn collections(&self) -> u64 {
        self.collections.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn cleanups(&self) -> u64 {
        self.cleanups.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

type SharedCollector = Arc<Mutex<Box<dyn Collector>>>;

struct RunningTask {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives the collect → record → cleanup cycle on a background task.
pub struct Pump {
    settings: PumpSettings,
    policy: RetentionPolicy,
    store: Arc<SnapshotStore>,
    collector: SharedCollector,
    sink: ExportSink,
    span: tracing::Span,
    stats: Arc<PumpStats>,
    state: PumpStateHandle,
    running: Option<RunningTask>,
}

impl Pump {
    pub fn new(
        collector: Box<dyn Collector>,
        store: Arc<SnapshotStore>,
        settings: PumpSettings,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            settings,
            policy,
            store,
            collector: Arc::new(Mutex::new(collector)),
            sink: ExportSink::disabled(),
            span: tracing::info_span!("pump"),
            stats: Arc::new(PumpStats::default()),
            state: PumpStateHandle::default(),
            running: None,
        }
    }

    pub fn with_sink(mut self, sink: ExportSink) -> Self {
        self.sink = sink;
        self
    }

    /// Parent span for everything the collection task logs.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> PumpState {
        self.state.get()
    }

    /// A handle for observing the lifecycle from elsewhere, e.g. while
    /// another task awaits `stop()`.
    pub fn state_handle(&self) -> PumpStateHandle {
        self.state.clone()
    }

    pub fn stats(&self) -> Arc<PumpStats> {
        Arc::clone(&self.stats)
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Spawns the collection task on the current tokio runtime.
    /// A no-op while already running.
    pub fn start(&mut self) -> Result<(), PumpError> {
        if self.running.is_some() {
            return Ok(());
        }
        let handle = Handle::try_current().map_err(|_| PumpError::NoRuntime)?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let cycle = CycleLoop {
            settings: self.settings,
            policy: self.policy,
            store: Arc::clone(&self.store),
            collector: Arc::clone(&self.collector),
            sink: self.sink.clone(),
            stats: Arc::clone(&self.stats),
            state: self.state.clone(),
            shutdown: shutdown_rx,
        };
        self.state.set(PumpState::Running);
        let task = handle.spawn(cycle.run().instrument(self.span.clone()));
        self.running = Some(RunningTask { shutdown, task });
        Ok(())
    }

    /// Signals the collection task and waits for it to exit.
    /// A no-op while idle.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.state.set(PumpState::Stopping);
        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await
            && e.is_panic()
        {
            error!(parent: &self.span, error = %e, "collection task panicked");
        }
        self.state.set(PumpState::Idle);
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            self.state.set(PumpState::Stopping);
            let _ = running.shutdown.send(true);
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

struct CycleLoop {
    settings: PumpSettings,
    policy: RetentionPolicy,
    store: Arc<SnapshotStore>,
    collector: SharedCollector,
    sink: ExportSink,
    stats: Arc<PumpStats>,
    state: PumpStateHandle,
    shutdown: watch::Receiver<bool>,
}

impl CycleLoop {
    async fn run(mut self) {
        info!(
            refresh_ms = self.settings.refresh_interval.as_millis() as u64,
            timeout_ms = self.settings.collection_timeout.as_millis() as u64,
            buffer_cap = self.policy.buffer_cap,
            retention_secs = self.policy.retention.as_secs(),
            "collection loop started"
        );

        let mut last_cleanup = Instant::now();
        while !*self.shutdown.borrow() {
            let cycle = PumpStats::bump(&self.stats.cycles);
            let span = debug_span!("pump.cycle", cycle);
            if let Flow::Stop = self.run_cycle(&mut last_cleanup).instrument(span).await {
                break;
            }
        }

        self.state.set(PumpState::Idle);
        info!("collection loop stopped");
    }

    async fn run_cycle(&mut self, last_cleanup: &mut Instant) -> Flow {
        let cycle_start = Instant::now();
        let mut span = self.sink.open_span("pump.cycle", CYCLE_SPAN_SLOTS);

        let Some(outcome) = self.collect_or_cancel().await else {
            span.attribute("outcome", "cancelled");
            return Flow::Stop;
        };
        let collection = cycle_start.elapsed();

        match outcome {
            Ok(snapshot) => {
                PumpStats::bump(&self.stats.collections);
                span.snapshot(&snapshot);
                span.attribute("outcome", "ok");
                self.store.record(snapshot);
            }
            Err(e) => {
                let failures = PumpStats::bump(&self.stats.failures);
                warn!(error = %e, failures, "collection failed; keeping previous snapshot");
                span.attribute("outcome", "error");
                span.attribute("error", e.to_string());
            }
        }

        if self.policy.cleanup_due(last_cleanup.elapsed()) {
            self.store.cleanup(self.policy.retention);
            *last_cleanup = Instant::now();
            PumpStats::bump(&self.stats.cleanups);
        }

        let elapsed = cycle_start.elapsed();
        let refresh = self.settings.refresh_interval;
        let overrun = elapsed >= refresh;
        span.attribute("collection.ms", collection.as_millis() as u64);
        span.attribute("cycle.ms", elapsed.as_millis() as u64);
        span.attribute("overrun", overrun);
        span.end();

        if overrun {
            PumpStats::bump(&self.stats.overruns);
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                refresh_ms = refresh.as_millis() as u64,
                "collection overran refresh interval"
            );
            return Flow::Continue;
        }

        if self.sleep_or_cancel(refresh - elapsed).await {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }

    /// Runs one collection on the blocking pool, bounded by the collection
    /// timeout. `None` means shutdown was requested first.
    async fn collect_or_cancel(&mut self) -> Option<Result<Snapshot, CollectionError>> {
        let collector = Arc::clone(&self.collector);
        let job = tokio::task::spawn_blocking(move || {
            // A timed-out call may still hold the collector.
            let mut guard = match collector.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return Err(CollectionError::Busy),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };
            guard.collect()
        });

        let timeout = self.settings.collection_timeout;
        tokio::select! {
            biased;
            _ = self.shutdown.changed() => None,
            result = tokio::time::timeout(timeout, job) => Some(match result {
                Err(_) => Err(CollectionError::Timeout(timeout)),
                Ok(Err(join)) => Err(CollectionError::Panicked(join.to_string())),
                Ok(Ok(collected)) => collected,
            }),
        }
    }

    /// Returns `false` if shutdown was requested before `duration` elapsed.
    async fn sleep_or_cancel(&mut self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.changed() => {
                debug!("shutdown requested during sleep");
                false
            }
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn policy() -> RetentionPolicy {
        RetentionPolicy::new(8, Duration::from_secs(60), Duration::from_secs(60)).unwrap()
    }

    fn ok_collector() -> Box<dyn Collector> {
        Box::new(|| -> Result<Snapshot, CollectionError> {
            Ok(Snapshot {
                timestamp: SystemTime::now(),
                ..Snapshot::default()
            })
        })
    }

    fn pump(refresh: Duration) -> Pump {
        let store = Arc::new(SnapshotStore::with_policy(&policy()));
        Pump::new(ok_collector(), store, PumpSettings::new(refresh), policy())
    }

    #[test]
    fn start_without_runtime_fails() {
        let mut pump = pump(Duration::from_millis(50));
        assert!(matches!(pump.start(), Err(PumpError::NoRuntime)));
        assert_eq!(pump.state(), PumpState::Idle);
    }

    #[tokio::test]
    async fn start_twice_and_stop_twice_are_noops() {
        let mut pump = pump(Duration::from_millis(20));
        pump.stop().await;
        assert_eq!(pump.state(), PumpState::Idle);

        pump.start().unwrap();
        pump.start().unwrap();
        assert_eq!(pump.state(), PumpState::Running);
        tokio::time::sleep(Duration::from_millis(70)).await;

        pump.stop().await;
        pump.stop().await;
        assert_eq!(pump.state(), PumpState::Idle);
        assert!(pump.stats().collections() >= 1);
    }

    #[tokio::test]
    async fn restart_after_stop_resumes_collection() {
        let mut pump = pump(Duration::from_millis(10));
        pump.start().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        pump.stop().await;
        let after_first = pump.stats().collections();

        pump.start().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        pump.stop().await;
        assert!(pump.stats().collections() > after_first);
    }

    #[tokio::test]
    async fn dropping_a_running_pump_is_observable_as_stopping_then_idle() {
        let mut pump = pump(Duration::from_millis(10));
        pump.start().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let state = pump.state_handle();
        assert_eq!(state.get(), PumpState::Running);
        drop(pump);
        // the task has not been polled since the signal
        assert_eq!(state.get(), PumpState::Stopping);

        for _ in 0..100 {
            if state.get() == PumpState::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(state.get(), PumpState::Idle);
    }

    #[tokio::test]
    async fn panicking_collector_is_a_failure_not_a_crash() {
        let store = Arc::new(SnapshotStore::with_policy(&policy()));
        let collector: Box<dyn Collector> =
            Box::new(|| -> Result<Snapshot, CollectionError> { panic!("boom") });
        let mut pump = Pump::new(
            collector,
            Arc::clone(&store),
            PumpSettings::new(Duration::from_millis(10)),
            policy(),
        );
        pump.start().unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        pump.stop().await;
        assert!(pump.stats().failures() >= 1);
        assert!(store.latest().is_empty());
    }
}
