use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use super::{AttributeValue, Exporter, MAX_OPEN_SPANS};
use crate::error::ExportError;
use crate::metrics::snapshot::Snapshot;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Snapshot {
        #[serde(flatten)]
        snapshot: &'a Snapshot,
    },
    Span {
        name: &'a str,
        duration_us: u64,
        attributes: &'a BTreeMap<String, AttributeValue>,
    },
}

struct OpenSpan {
    name: String,
    started: Instant,
    attributes: BTreeMap<String, AttributeValue>,
}

/// Appends one JSON object per line: snapshots and finished spans.
pub struct JsonLinesExporter<W: Write + Send = BufWriter<File>> {
    out: W,
    spans: Vec<OpenSpan>,
}

impl JsonLinesExporter {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::options().create(true).append(true).open(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesExporter<W> {
    pub fn from_writer(out: W) -> Self {
        Self {
            out,
            spans: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record(&mut self, record: &Record<'_>) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + Send> Exporter for JsonLinesExporter<W> {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), ExportError> {
        self.write_record(&Record::Snapshot { snapshot })?;
        self.out.flush()?;
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
            attributes: BTreeMap::new(),
        });
        Ok(())
    }

    fn on_span_end(&mut self) -> Result<(), ExportError> {
        let Some(span) = self.spans.pop() else {
            return Ok(());
        };
        self.write_record(&Record::Span {
            name: &span.name,
            duration_us: span.started.elapsed().as_micros() as u64,
            attributes: &span.attributes,
        })
    }

    fn on_span_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), ExportError> {
        if let Some(span) = self.spans.last_mut() {
            span.attributes.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn lines(buf: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn snapshot_line_is_tagged_and_flattened() {
        let mut exporter = JsonLinesExporter::from_writer(Vec::new());
        exporter
            .on_snapshot(&Snapshot {
                total_processes: 42,
                ..Snapshot::default()
            })
            .unwrap();
        let records = lines(&exporter.into_inner());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["type"], "snapshot");
        assert_eq!(records[0]["total_processes"], 42);
    }

    #[test]
    fn span_line_carries_attributes() {
        let mut exporter = JsonLinesExporter::from_writer(Vec::new());
        exporter.on_span_start("pump.cycle").unwrap();
        exporter.on_span_attribute("outcome", "ok".into()).unwrap();
        exporter.on_span_attribute("overrun", true.into()).unwrap();
        exporter.on_span_end().unwrap();
        let records = lines(&exporter.into_inner());
        assert_eq!(records[0]["type"], "span");
        assert_eq!(records[0]["name"], "pump.cycle");
        assert_eq!(records[0]["attributes"]["outcome"], "ok");
        assert_eq!(records[0]["attributes"]["overrun"], true);
    }

    #[test]
    fn abandoned_spans_do_not_accumulate() {
        let mut exporter = JsonLinesExporter::from_writer(Vec::new());
        for _ in 0..MAX_OPEN_SPANS + 5 {
            exporter.on_span_start("orphan").unwrap();
        }
        exporter.on_span_start("pump.cycle").unwrap();
        exporter.on_span_attribute("outcome", "ok".into()).unwrap();
        exporter.on_span_end().unwrap();
        assert_eq!(exporter.spans.len(), MAX_OPEN_SPANS - 1);

        let records = lines(&exporter.into_inner());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "pump.cycle");
        assert_eq!(records[0]["attributes"]["outcome"], "ok");
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = std::env::temp_dir().join(format!("hostwatch_jsonl_{}", std::process::id()));
        let path = dir.join("nested").join("out.jsonl");
        let mut exporter = JsonLinesExporter::create(&path).unwrap();
        exporter.on_snapshot(&Snapshot::default()).unwrap();
        drop(exporter);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
