//! Per-epoch metrics for tree sentiment training
//!
//! [`MetricsRecord`] is the append-only history persisted after every
//! epoch; [`MetricsTracker`] owns it during a session and fans each update
//! out to the configured exporters.

pub mod exporters;
pub mod tracker;

pub use exporters::{JsonExporter, MetricsExporter, TracingExporter};
pub use tracker::MetricsTracker;

use std::fmt;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::training::evaluator::Evaluation;
use crate::utils::io::write_file_atomic;

/// Square count matrix indexed as `[true_label][predicted_label]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfusionMatrix(Array2<u64>);

impl ConfusionMatrix {
    /// All-zero matrix for `num_labels` classes
    pub fn new(num_labels: usize) -> Self {
        Self(Array2::zeros((num_labels, num_labels)))
    }

    /// Number of classes
    pub fn num_labels(&self) -> usize {
        self.0.nrows()
    }

    /// Count one (true, predicted) pair
    pub fn record(&mut self, true_label: usize, predicted: usize) -> Result<()> {
        let n = self.num_labels();
        if true_label >= n {
            return Err(Error::invalid_input(format!(
                "true label {true_label} outside {n} classes"
            )));
        }
        if predicted >= n {
            return Err(Error::model(format!(
                "predicted label {predicted} outside {n} classes"
            )));
        }
        self.0[[true_label, predicted]] += 1;
        Ok(())
    }

    /// Count for a (true, predicted) pair
    pub fn get(&self, true_label: usize, predicted: usize) -> u64 {
        self.0[[true_label, predicted]]
    }

    /// Occurrences of `label` as the true label
    pub fn row_sum(&self, label: usize) -> u64 {
        self.0.row(label).sum()
    }

    /// Occurrences of `label` as the prediction
    pub fn col_sum(&self, label: usize) -> u64 {
        self.0.column(label).sum()
    }

    /// Total examples counted
    pub fn total(&self) -> u64 {
        self.0.sum()
    }

    /// Examples on the diagonal
    pub fn correct(&self) -> u64 {
        self.0.diag().sum()
    }

    /// Number of distinct true labels that occurred
    pub fn observed_labels(&self) -> usize {
        (0..self.num_labels()).filter(|&l| self.row_sum(l) > 0).count()
    }

    /// One-vs-rest F1 of a single class; zero when the class never occurs
    /// and is never predicted
    pub fn f1_for(&self, label: usize) -> f64 {
        if label >= self.num_labels() {
            return 0.0;
        }
        let tp = self.get(label, label);
        let fp = self.col_sum(label) - tp;
        let fn_ = self.row_sum(label) - tp;
        let denom = 2 * tp + fp + fn_;
        if denom == 0 {
            0.0
        } else {
            (2 * tp) as f64 / denom as f64
        }
    }

    /// Per-class F1 averaged with true-label support as weights
    pub fn weighted_f1(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (0..self.num_labels())
            .map(|l| self.f1_for(l) * self.row_sum(l) as f64)
            .sum::<f64>()
            / total as f64
    }

    /// Underlying counts
    pub fn as_array(&self) -> &Array2<u64> {
        &self.0
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only per-epoch history of the four tracked metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(with = "float_series")]
    avg_loss: Vec<f64>,
    #[serde(with = "float_series")]
    dev_accuracy: Vec<f64>,
    #[serde(with = "float_series")]
    f1_score: Vec<f64>,
    conf_matrix: Vec<ConfusionMatrix>,
}

/// JSON has no NaN or infinity; those values are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"` so a diverged run still reloads.
mod float_series {
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for &value in values {
            if value.is_nan() {
                seq.serialize_element("NaN")?;
            } else if value.is_infinite() {
                seq.serialize_element(if value > 0.0 { "inf" } else { "-inf" })?;
            } else {
                seq.serialize_element(&value)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Entry>::deserialize(deserializer)?
            .into_iter()
            .map(|entry| match entry {
                Entry::Number(value) => Ok(value),
                Entry::Text(text) => match text.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("invalid metric value '{other}'"))),
                },
            })
            .collect()
    }
}

impl MetricsRecord {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch's results to every sequence
    pub fn record(&mut self, avg_loss: f64, evaluation: &Evaluation) -> &mut Self {
        self.avg_loss.push(avg_loss);
        self.dev_accuracy.push(evaluation.accuracy);
        self.f1_score.push(evaluation.f1_score);
        self.conf_matrix.push(evaluation.conf_matrix.clone());
        self
    }

    /// Number of recorded epochs
    pub fn len(&self) -> usize {
        self.avg_loss.len()
    }

    /// True before the first epoch is recorded
    pub fn is_empty(&self) -> bool {
        self.avg_loss.is_empty()
    }

    /// Mean training loss per epoch
    pub fn avg_loss(&self) -> &[f64] {
        &self.avg_loss
    }

    /// Dev accuracy per epoch
    pub fn dev_accuracy(&self) -> &[f64] {
        &self.dev_accuracy
    }

    /// Dev F1 per epoch
    pub fn f1_score(&self) -> &[f64] {
        &self.f1_score
    }

    /// Dev confusion matrix per epoch
    pub fn conf_matrix(&self) -> &[ConfusionMatrix] {
        &self.conf_matrix
    }

    /// Write the record as JSON, replacing any previous file atomically
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_file_atomic(path, &json)?;
        Ok(())
    }

    /// Read a record written by [`MetricsRecord::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}
