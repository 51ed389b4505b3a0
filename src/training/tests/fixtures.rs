//! Test fixtures for setting up common test scenarios

use std::cell::Cell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::model::{ModelParams, ParamTensor, StepOutput, Tree, TreeModel, Vocabulary, NUM_LABELS};
use crate::training::data::{write_examples, DatasetSource, Example};

/// Deterministic stand-in for a real network.
///
/// The root is predicted as `first word id % 3`; every other node gets a
/// different class, so reading anything but the last prediction shows up as
/// a wrong answer. Its single parameter depends on the order of training
/// steps.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    /// Order-dependent stand-in for trained weights
    pub state: f32,
    /// Training steps taken
    pub steps: usize,
    /// Label argument of every training step
    pub labels_seen: Vec<Option<usize>>,
    /// Embedding source used for initialization
    pub initialized_from: Option<PathBuf>,
    /// Trees scored through `predict`
    pub predict_calls: Cell<usize>,
    losses: VecDeque<f64>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model returning these losses from its first training steps
    pub fn with_losses(losses: Vec<f64>) -> Self {
        Self {
            losses: losses.into(),
            ..Self::default()
        }
    }

    /// Root class this model predicts for `tree`
    pub fn label_for(tree: &Tree) -> usize {
        tree.words().next().unwrap_or(0) as usize % NUM_LABELS
    }

    fn one_hot(label: usize) -> Vec<f32> {
        let mut v = vec![0.0; NUM_LABELS];
        v[label] = 1.0;
        v
    }
}

impl TreeModel for ScriptedModel {
    fn output_dim(&self) -> usize {
        NUM_LABELS
    }

    fn initialize_embeddings(&mut self, vocab: &Vocabulary, source: &Path) -> Result<()> {
        self.initialized_from = Some(source.to_path_buf());
        self.state = vocab.size() as f32;
        Ok(())
    }

    fn params(&self) -> Result<ModelParams> {
        let mut params = ModelParams::new();
        params.insert("state", ParamTensor::new(vec![1], vec![self.state])?);
        params.insert("steps", ParamTensor::new(vec![1], vec![self.steps as f32])?);
        Ok(params)
    }

    fn set_params(&mut self, params: &ModelParams) -> Result<()> {
        let value = |name: &str| {
            params
                .get(name)
                .and_then(|t| t.data.first().copied())
                .ok_or_else(|| Error::invalid_input(format!("missing parameter {name}")))
        };
        self.state = value("state")?;
        self.steps = value("steps")? as usize;
        Ok(())
    }

    fn train_step(&mut self, tree: &Tree, label: Option<usize>) -> Result<StepOutput> {
        self.labels_seen.push(label);
        let word_sum: u32 = tree.words().sum();
        let loss = self
            .losses
            .pop_front()
            .unwrap_or_else(|| (word_sum as f64 + 1.0) / 10.0);

        self.state = self.state * 0.5 + word_sum as f32 + 1.0;
        self.steps += 1;

        Ok(StepOutput {
            loss,
            prediction: Self::one_hot(Self::label_for(tree)),
        })
    }

    fn predict(&self, tree: &Tree) -> Result<Vec<Vec<f32>>> {
        self.predict_calls.set(self.predict_calls.get() + 1);
        let root = Self::label_for(tree);
        let mut scores = vec![Self::one_hot((root + 1) % NUM_LABELS); tree.len() - 1];
        scores.push(Self::one_hot(root));
        Ok(scores)
    }
}

/// Dataset laid out on disk in a temporary directory
pub struct DataTestFixture {
    pub temp_dir: TempDir,
}

impl DataTestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `root/train/batch_NN.<ext>` and `root/dev/dev_NN.json` files
    pub fn chunked(&self, batches: &[Vec<Example>], dev: &[Vec<Example>], ext: &str) -> DatasetSource {
        let root = self.path().join("dump");
        for (i, batch) in batches.iter().enumerate() {
            write_examples(&root.join("train").join(format!("batch_{i:02}.{ext}")), batch).unwrap();
        }
        for (i, part) in dev.iter().enumerate() {
            write_examples(&root.join("dev").join(format!("dev_{i:02}.json")), part).unwrap();
        }
        DatasetSource::Chunked { root }
    }

    /// Write one split file with `train`, `dev` and an unrelated extra key
    pub fn split_file(&self, train: &[Example], dev: &[Example]) -> DatasetSource {
        let path = self.path().join("split.json");
        let value = serde_json::json!({
            "train": train,
            "dev": dev,
            "max_degree": 2,
        });
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        DatasetSource::SplitFile { path }
    }

    /// Write separate train and dev files
    pub fn separate_files(&self, train: &[Example], dev: &[Example]) -> DatasetSource {
        let train_path = self.path().join("train.json");
        let dev_path = self.path().join("dev.json");
        write_examples(&train_path, train).unwrap();
        write_examples(&dev_path, dev).unwrap();
        DatasetSource::SeparateFiles {
            train: train_path,
            dev: dev_path,
        }
    }
}
