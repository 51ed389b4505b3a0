//! Metrics tracker for a training session
//!
//! The tracker owns the in-memory [`MetricsRecord`] and hands it to every
//! exporter after each epoch. Export failures are logged and counted but
//! never abort training.

use tracing::{debug, warn};

use super::{JsonExporter, MetricsExporter, MetricsRecord, TracingExporter};
use crate::config::OutputConfig;
use crate::training::evaluator::Evaluation;

/// Per-session metrics coordinator
pub struct MetricsTracker {
    record: MetricsRecord,
    exporters: Vec<Box<dyn MetricsExporter>>,
    export_failures: usize,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    /// Tracker with no exporters
    pub fn new() -> Self {
        Self {
            record: MetricsRecord::new(),
            exporters: Vec::new(),
            export_failures: 0,
        }
    }

    /// Add an exporter
    pub fn with_exporter(mut self, exporter: Box<dyn MetricsExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// Tracker logging every epoch, plus a JSON dump when a metrics path is set
    pub fn from_output(output: &OutputConfig) -> Self {
        let mut tracker = Self::new().with_exporter(Box::new(TracingExporter));
        if let Some(path) = &output.metrics_dump_path {
            tracker = tracker.with_exporter(Box::new(JsonExporter::new(path.clone())));
        }
        tracker
    }

    /// Append one epoch and push the updated record to every exporter
    pub fn track(&mut self, avg_loss: f64, evaluation: &Evaluation) {
        self.record.record(avg_loss, evaluation);

        for exporter in &mut self.exporters {
            match exporter.export(&self.record) {
                Ok(()) => debug!("Exported metrics via {}", exporter.name()),
                Err(e) => {
                    self.export_failures += 1;
                    warn!("Failed to export metrics via {}: {}", exporter.name(), e);
                }
            }
        }
    }

    /// Record accumulated so far
    pub fn record(&self) -> &MetricsRecord {
        &self.record
    }

    /// Take ownership of the record
    pub fn into_record(self) -> MetricsRecord {
        self.record
    }

    /// Number of exports that failed
    pub fn export_failures(&self) -> usize {
        self.export_failures
    }
}
