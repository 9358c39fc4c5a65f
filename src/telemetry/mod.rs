//! Best-effort telemetry export.
//!
//! The pump never talks to an [`Exporter`] directly. It pushes
//! [`ExportEvent`]s into an [`ExportSink`], a bounded channel drained by a
//! separate dispatcher task. A full or closed channel drops the event, so a
//! slow or failing exporter cannot stall collection.

mod jsonl;
mod log_exporter;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::mpsc::{self, OwnedPermit};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ExportError;
use crate::metrics::snapshot::Snapshot;

pub use jsonl::JsonLinesExporter;
pub use log_exporter::LogExporter;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => f.write_str(s),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v:.3}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Deepest span nesting an exporter tracks. Older open spans are discarded
/// past this depth.
pub(crate) const MAX_OPEN_SPANS: usize = 32;

/// Receiver of snapshots and span lifecycle events.
pub trait Exporter: Send {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), ExportError>;
    fn on_span_start(&mut self, name: &str) -> Result<(), ExportError>;
    fn on_span_end(&mut self) -> Result<(), ExportError>;
    fn on_span_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), ExportError>;

    fn flush(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum ExportEvent {
    Snapshot(Box<Snapshot>),
    SpanStart(&'static str),
    SpanAttribute(&'static str, AttributeValue),
    SpanEnd,
}

impl ExportEvent {
    fn deliver(self, exporter: &mut dyn Exporter) -> Result<(), ExportError> {
        match self {
            ExportEvent::Snapshot(snapshot) => exporter.on_snapshot(&snapshot),
            ExportEvent::SpanStart(name) => exporter.on_span_start(name),
            ExportEvent::SpanAttribute(key, value) => exporter.on_span_attribute(key, value),
            ExportEvent::SpanEnd => exporter.on_span_end(),
        }
    }
}

/// Cloneable, non-blocking handle for pushing events to an exporter.
#[derive(Clone, Debug, Default)]
pub struct ExportSink {
    tx: Option<mpsc::Sender<ExportEvent>>,
    dropped: Arc<AtomicU64>,
}

impl ExportSink {
    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Events discarded because the channel was full or closed. A span that
    /// could not reserve its slots counts once.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(dropped, "export queue unavailable; event dropped");
    }

    pub fn push(&self, event: ExportEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.try_send(event).is_err() {
            self.record_drop();
        }
    }

    pub fn snapshot(&self, snapshot: &Snapshot) {
        if self.is_enabled() {
            self.push(ExportEvent::Snapshot(Box::new(snapshot.clone())));
        }
    }

    /// Opens a span with room for `slots` events between its start and end.
    ///
    /// All queue slots are reserved before anything is sent, so the exporter
    /// sees the span complete or not at all. When the queue cannot hold the
    /// whole span, the returned span is inert.
    pub fn open_span(&self, name: &'static str, slots: usize) -> ExportSpan {
        let Some(tx) = &self.tx else {
            return ExportSpan::inert(self.dropped.clone());
        };

        let mut permits = Vec::with_capacity(slots + 2);
        for _ in 0..slots + 2 {
            match tx.clone().try_reserve_owned() {
                Ok(permit) => permits.push(permit),
                Err(_) => {
                    // reserved permits go back to the channel on drop
                    self.record_drop();
                    return ExportSpan::inert(self.dropped.clone());
                }
            }
        }

        let end = permits.pop();
        if let Some(start) = permits.pop() {
            start.send(ExportEvent::SpanStart(name));
        }
        ExportSpan {
            permits,
            end,
            dropped: self.dropped.clone(),
        }
    }
}

/// An open span holding its reserved queue slots. The end event is sent
/// when the span is dropped, whatever path the caller took.
#[derive(Debug)]
pub struct ExportSpan {
    permits: Vec<OwnedPermit<ExportEvent>>,
    end: Option<OwnedPermit<ExportEvent>>,
    dropped: Arc<AtomicU64>,
}

impl ExportSpan {
    fn inert(dropped: Arc<AtomicU64>) -> Self {
        Self {
            permits: Vec::new(),
            end: None,
            dropped,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.end.is_some()
    }

    fn send(&mut self, event: ExportEvent) {
        if !self.is_recording() {
            return;
        }
        match self.permits.pop() {
            Some(permit) => {
                permit.send(event);
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&mut self, snapshot: &Snapshot) {
        if self.is_recording() {
            self.send(ExportEvent::Snapshot(Box::new(snapshot.clone())));
        }
    }

    pub fn attribute(&mut self, key: &'static str, value: impl Into<AttributeValue>) {
        if self.is_recording() {
            self.send(ExportEvent::SpanAttribute(key, value.into()));
        }
    }

    pub fn end(self) {}
}

impl Drop for ExportSpan {
    fn drop(&mut self) {
        if let Some(end) = self.end.take() {
            end.send(ExportEvent::SpanEnd);
        }
    }
}

/// Spawns the dispatcher task that feeds `exporter` from a queue of
/// `capacity` events. The task ends, flushing the exporter, once every
/// clone of the returned sink is dropped.
pub fn spawn_exporter<E>(mut exporter: E, capacity: usize) -> (ExportSink, JoinHandle<()>)
where
    E: Exporter + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ExportEvent>(capacity.max(1));
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = event.deliver(&mut exporter) {
                warn!(error = %e, "exporter rejected event");
            }
        }
        if let Err(e) = exporter.flush() {
            warn!(error = %e, "exporter flush failed");
        }
        debug!("export dispatcher stopped");
    });
    let sink = ExportSink {
        tx: Some(tx),
        dropped: Arc::new(AtomicU64::new(0)),
    };
    (sink, handle)
}
