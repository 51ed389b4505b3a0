//! Dataset layouts: fully in-memory partitions or chunked batch files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::loaders::{list_batch_files, load_and_concatenate, read_examples, read_file, validate_partition};
use super::{DataError, Example, LabelCounts};

/// Where a dataset lives on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum DatasetSource {
    /// `root/train/` and `root/dev/` each hold one or more batch files
    Chunked {
        /// Directory containing `train/` and `dev/`
        root: PathBuf,
    },
    /// One file with `train` and `dev` keys; other keys are ignored
    SplitFile {
        /// Path of the split file
        path: PathBuf,
    },
    /// Separate files for each partition
    SeparateFiles {
        /// Training examples
        train: PathBuf,
        /// Dev examples
        dev: PathBuf,
    },
}

#[derive(Deserialize)]
struct SplitFile {
    train: Vec<Example>,
    dev: Vec<Example>,
}

/// Training partition, either materialized or left on disk as batch files
#[derive(Debug, Clone)]
pub enum TrainPartition {
    /// All training examples in memory
    InMemory(Vec<Example>),
    /// Ordered batch files, each read when its turn comes
    Chunked(Vec<PathBuf>),
}

/// Train and dev partitions of one session, label-checked on construction
#[derive(Debug, Clone)]
pub struct Dataset {
    train: TrainPartition,
    dev: Vec<Example>,
    train_count: usize,
}

impl Dataset {
    /// Load and validate a dataset from its on-disk layout
    #[instrument]
    pub fn load(source: &DatasetSource) -> Result<Self, DataError> {
        match source {
            DatasetSource::Chunked { root } => {
                let train_files = list_batch_files(&root.join("train"))?;
                let dev_files = list_batch_files(&root.join("dev"))?;
                Self::chunked(train_files, &dev_files)
            }
            DatasetSource::SplitFile { path } => {
                let split: SplitFile = read_file(path)?;
                Self::in_memory(split.train, split.dev)
            }
            DatasetSource::SeparateFiles { train, dev } => {
                Self::in_memory(read_examples(train)?, read_examples(dev)?)
            }
        }
    }

    /// Dataset held fully in memory
    pub fn in_memory(mut train: Vec<Example>, mut dev: Vec<Example>) -> Result<Self, DataError> {
        let train_counts = check_partition(&mut train, "train")?;
        let dev_counts = check_partition(&mut dev, "dev")?;
        info!("train {} ({})", train.len(), train_counts);
        info!("dev {} ({})", dev.len(), dev_counts);

        Ok(Self {
            train_count: train.len(),
            train: TrainPartition::InMemory(train),
            dev,
        })
    }

    /// Dataset whose training partition stays in batch files.
    ///
    /// Every batch is read and validated once here so that a bad label fails
    /// the session before any training happens. The dev files are
    /// concatenated into one in-memory partition.
    pub fn chunked(train_files: Vec<PathBuf>, dev_files: &[PathBuf]) -> Result<Self, DataError> {
        if train_files.is_empty() {
            return Err(DataError::EmptyPartition {
                partition: "train".to_string(),
            });
        }

        let mut dev = load_and_concatenate(dev_files)?;
        let dev_counts = check_partition(&mut dev, "dev")?;

        let mut train_counts = LabelCounts::default();
        for (batch_nr, path) in train_files.iter().enumerate() {
            let batch = load_batch(path)?;
            let mut counts = LabelCounts::default();
            for example in &batch {
                counts.0[example.label] += 1;
            }
            info!("Batch {} of {} OK ({})", batch_nr + 1, train_files.len(), counts);
            train_counts.merge(counts);
        }

        info!("train {} ({})", train_counts.total(), train_counts);
        info!("dev {} ({})", dev.len(), dev_counts);

        Ok(Self {
            train_count: train_counts.total(),
            train: TrainPartition::Chunked(train_files),
            dev,
        })
    }

    /// Training partition
    pub fn train(&self) -> &TrainPartition {
        &self.train
    }

    /// Dev partition
    pub fn dev(&self) -> &[Example] {
        &self.dev
    }

    /// Number of training examples across all batches
    pub fn train_count(&self) -> usize {
        self.train_count
    }

    /// Training passes per epoch: one per batch file, or one when in memory
    pub fn num_batches(&self) -> usize {
        match &self.train {
            TrainPartition::InMemory(_) => 1,
            TrainPartition::Chunked(files) => files.len(),
        }
    }

    /// Whether training data is streamed from batch files
    pub fn is_chunked(&self) -> bool {
        matches!(self.train, TrainPartition::Chunked(_))
    }
}

/// Read and validate a single training batch file
pub fn load_batch(path: &Path) -> Result<Vec<Example>, DataError> {
    let mut batch = read_examples(path)?;
    let partition = path.to_string_lossy();
    check_partition(&mut batch, &partition)?;
    Ok(batch)
}

fn check_partition(examples: &mut [Example], partition: &str) -> Result<LabelCounts, DataError> {
    if examples.is_empty() {
        return Err(DataError::EmptyPartition {
            partition: partition.to_string(),
        });
    }
    validate_partition(examples, partition)
}
