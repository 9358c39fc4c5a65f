use std::time::Instant;

use tracing::{debug, info, warn};

use super::{AttributeValue, Exporter, MAX_OPEN_SPANS};
use crate::error::ExportError;
use crate::format::format_bytes;
use crate::metrics::snapshot::Snapshot;

struct OpenSpan {
    name: String,
    started: Instant,
    attributes: Vec<(String, AttributeValue)>,
}

/// Writes snapshot summaries and finished spans to the tracing log.
#[derive(Default)]
pub struct LogExporter {
    spans: Vec<OpenSpan>,
}

impl LogExporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Exporter for LogExporter {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), ExportError> {
        let (tx, rx) = snapshot.total_network_rates();
        let (read, write) = snapshot.total_disk_rates();
        info!(
            target: "hostwatch::export",
            cpu = %format!("{:.1}%", snapshot.cpu.usage_percent),
            memory = %format!("{:.1}%", snapshot.memory.load_percent()),
            processes = snapshot.total_processes,
            threads = snapshot.total_threads,
            net_tx = %format_bytes(tx),
            net_rx = %format_bytes(rx),
            disk_read = %format_bytes(read),
            disk_write = %format_bytes(write),
            "snapshot"
        );
        Ok(())
    }

    fn on_span_start(&mut self, name: &str) -> Result<(), ExportError> {
        if self.spans.len() >= MAX_OPEN_SPANS {
            let stale = self.spans.remove(0);
            warn!(
                target: "hostwatch::export",
                span = %stale.name,
                "discarding span that never ended"
            );
        }
        self.spans.push(OpenSpan {
            name: name.to_string(),
            started: Instant::now(),
            attributes: Vec::new(),
        });
        Ok(())
    }

    fn on_span_end(&mut self) -> Result<(), ExportError> {
        let Some(span) = self.spans.pop() else {
            debug!(target: "hostwatch::export", "span end without matching start");
            return Ok(());
        };
        let attributes = span
            .attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        debug!(
            target: "hostwatch::export",
            span = %span.name,
            elapsed_us = span.started.elapsed().as_micros() as u64,
            %attributes,
            "span finished"
        );
        Ok(())
    }

    fn on_span_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), ExportError> {
        if let Some(span) = self.spans.last_mut() {
            span.attributes.push((key.to_string(), value));
        }
        Ok(())
    }
}
