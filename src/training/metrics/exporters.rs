//! Metrics exporters
//!
//! An exporter receives the full [`MetricsRecord`] after each epoch. The
//! JSON exporter rewrites a file on disk; the tracing exporter logs the
//! latest epoch.

use std::path::{Path, PathBuf};

use tracing::info;

use super::MetricsRecord;
use crate::error::Result;

/// Trait for metrics exporters
pub trait MetricsExporter {
    /// Exporter name
    fn name(&self) -> &str;

    /// Export the record as it stands after the latest epoch
    fn export(&mut self, record: &MetricsRecord) -> Result<()>;
}

/// Rewrites the whole record as JSON after every epoch
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    /// Exporter writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsExporter for JsonExporter {
    fn name(&self) -> &str {
        "json_exporter"
    }

    fn export(&mut self, record: &MetricsRecord) -> Result<()> {
        record.save(&self.path)?;
        info!("Dumped metrics to {:?}", self.path);
        Ok(())
    }
}

/// Logs the most recent epoch's metrics
#[derive(Default)]
pub struct TracingExporter;

impl MetricsExporter for TracingExporter {
    fn name(&self) -> &str {
        "tracing_exporter"
    }

    fn export(&mut self, record: &MetricsRecord) -> Result<()> {
        let epoch = record.len();
        if epoch == 0 {
            return Ok(());
        }
        let last = epoch - 1;
        info!(
            epoch,
            avg_loss = record.avg_loss()[last],
            dev_accuracy = record.dev_accuracy()[last],
            f1_score = record.f1_score()[last],
            "Epoch metrics"
        );
        info!("Confusion matrix:\n{}", record.conf_matrix()[last]);
        Ok(())
    }
}
