//! The metrics pipeline: a [`Pump`] runs a [`Collector`] on a fixed
//! cadence and records each [`Snapshot`] into a shared [`SnapshotStore`].
//!
//! ```text
//! Pump ──collect()──▶ Collector
//!  │
//!  ├──record()──▶ SnapshotStore ◀──latest()/history()── presenter
//!  ├──cleanup()─▶ SnapshotStore
//!  └──push()────▶ ExportSink ──▶ Exporter
//! ```

pub mod collector;
pub mod platform;
pub mod pump;
pub mod retention;
pub mod snapshot;
pub mod store;

pub use collector::{Collector, SysinfoCollector};
pub use pump::{Pump, PumpSettings, PumpState, PumpStateHandle, PumpStats};
pub use retention::RetentionPolicy;
pub use snapshot::Snapshot;
pub use store::SnapshotStore;
