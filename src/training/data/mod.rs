//! Data loading infrastructure for tree sentiment training
//!
//! This module provides the labeled example type, dataset layouts (fully
//! in-memory or chunked into batch files on disk) and the file loaders that
//! back them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Tree, NUM_LABELS};

pub mod datasets;
pub mod loaders;

// Re-exports
pub use datasets::{load_batch, Dataset, DatasetSource, TrainPartition};
pub use loaders::{list_batch_files, load_and_concatenate, read_examples, validate_partition, write_examples};

/// One labeled tree, optionally paired with a price-lag signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Parsed sentence
    pub tree: Tree,
    /// Sentiment class: 0 negative, 1 neutral, 2 positive
    pub label: usize,
    /// Subsequent price movement, used only for profit evaluation
    #[serde(default)]
    pub lag: Option<f64>,
}

impl Example {
    /// Labeled example without lag
    pub fn new(tree: Tree, label: usize) -> Self {
        Self { tree, label, lag: None }
    }

    /// Labeled example with a lag value
    pub fn with_lag(tree: Tree, label: usize, lag: f64) -> Self {
        Self {
            tree,
            label,
            lag: Some(lag),
        }
    }
}

/// Per-class example counts of a partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts(pub [usize; NUM_LABELS]);

impl LabelCounts {
    /// Total examples counted
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Fold another partition's counts into this one
    pub fn merge(&mut self, other: LabelCounts) {
        for (a, b) in self.0.iter_mut().zip(other.0) {
            *a += b;
        }
    }
}

impl fmt::Display for LabelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "negative={} neutral={} positive={}", self.0[0], self.0[1], self.0[2])
    }
}

/// Error types for data loading
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Dataset not found: {path}")]
    DatasetNotFound { path: String },

    #[error("Partition '{partition}' has no examples")]
    EmptyPartition { partition: String },

    #[error("Label {label} of example {index} in '{partition}' is outside 0..{max}", max = NUM_LABELS)]
    InvalidLabel {
        partition: String,
        index: usize,
        label: usize,
    },

    #[error("Example {index} in '{partition}' has label {label} but its root is labeled {root_label}")]
    LabelMismatch {
        partition: String,
        index: usize,
        label: usize,
        root_label: usize,
    },

    #[error("Example {index} has no lag value")]
    MissingLag { index: usize },

    #[error("Malformed tree: {reason}")]
    MalformedTree { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Binary batch error: {0}")]
    BincodeError(#[from] bincode::Error),
}
