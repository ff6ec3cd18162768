//! Accumulator that writes metrics as JSON lines.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use metric_types::{Accumulator, Fields, IngestError, Metric, Tags};
use tracing::error;

/// Writes each metric as one JSON object per line and logs ingestion errors.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    metrics: AtomicU64,
    errors: AtomicU64,
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            metrics: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Number of metrics written so far.
    pub fn metric_count(&self) -> u64 {
        self.metrics.load(Ordering::Relaxed)
    }

    /// Number of errors received so far (including write failures).
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_metric(&self, metric: &Metric) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_writer(&mut *writer, metric)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl<W: Write + Send> Accumulator for JsonLinesSink<W> {
    fn add_fields(&self, name: &str, fields: Fields, tags: Tags, timestamp: DateTime<Utc>) {
        let metric = Metric::new(name, fields, tags, timestamp);
        match self.write_metric(&metric) {
            Ok(()) => {
                self.metrics.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                error!("Failed to write metric '{name}': {e}");
            }
        }
    }

    fn add_error(&self, err: IngestError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!("{err}");
    }
}
