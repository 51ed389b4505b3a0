//! Configuration structures for treesent training sessions
//!
//! A [`Config`] is built once (from defaults or a JSON/YAML file), validated,
//! and then passed by reference to everything that needs it. Nothing reads
//! hyperparameters from global state, so independent sessions can run side
//! by side with different settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{MAX_DEGREE, NUM_LABELS};
use crate::training::data::DatasetSource;

/// Main configuration for a training session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model hyperparameters
    pub model: ModelConfig,
    /// Epoch loop settings
    pub training: TrainingParams,
    /// Input locations
    pub data: DataConfig,
    /// Checkpoint and metrics destinations
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, format chosen by extension
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)?
        };
        crate::utils::io::write_file_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;

        if self.training.num_epochs == 0 {
            return Err(Error::config("Number of epochs must be greater than 0"));
        }

        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

/// Tree-LSTM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Word embedding width
    pub embedding_dim: usize,
    /// Hidden and memory cell width
    pub hidden_dim: usize,
    /// Number of label classes
    pub output_dim: usize,
    /// Maximum children per node
    pub max_degree: usize,
    /// Step size for online updates
    pub learning_rate: f64,
    /// Update rule
    pub optimizer: OptimizerType,
    /// Whether embeddings are updated during training
    pub trainable_embeddings: bool,
    /// Seed for parameter initialization
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 300,
            hidden_dim: 100,
            output_dim: NUM_LABELS,
            max_degree: MAX_DEGREE,
            learning_rate: 0.01,
            optimizer: OptimizerType::Sgd,
            trainable_embeddings: true,
            seed: 22,
        }
    }
}

impl ModelConfig {
    /// Validate model hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 || self.hidden_dim == 0 {
            return Err(Error::config("Embedding and hidden dimensions must be > 0"));
        }

        if self.output_dim != NUM_LABELS {
            return Err(Error::config(format!(
                "Output dimension must be {} (negative, neutral, positive), got {}",
                NUM_LABELS, self.output_dim
            )));
        }

        if self.max_degree == 0 {
            return Err(Error::config("Maximum tree degree must be > 0"));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config("Learning rate must be positive"));
        }

        Ok(())
    }
}

/// Update rules for the online training step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerType {
    /// Plain stochastic gradient descent
    Sgd,
    /// Adam with decoupled weight decay
    AdamW,
    /// AdaDelta; the learning rate scales its update, 1.0 being the plain rule
    AdaDelta,
}

/// How the evaluator turns predictions into an F1 score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum F1Mode {
    /// Weighted multi-class F1 when more than two distinct true labels are
    /// present, otherwise binary F1 with label 2 as the positive class
    #[default]
    Observed,
    /// Always weighted F1 over all classes
    Weighted,
}

/// Epoch loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Full passes over the training partition
    pub num_epochs: usize,
    /// F1 selection rule for dev evaluation
    pub f1_mode: F1Mode,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            num_epochs: 30,
            f1_mode: F1Mode::Observed,
        }
    }
}

/// Where inputs come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Vocabulary file (plain text or JSON)
    pub vocab_path: PathBuf,
    /// Dataset layout
    pub source: DatasetSource,
    /// Pretrained word vectors for fresh initialization
    pub embeddings_path: Option<PathBuf>,
    /// Parameter checkpoint to start from instead of fresh initialization
    pub init_params_path: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            vocab_path: PathBuf::from("data/vocab.txt"),
            source: DatasetSource::Chunked {
                root: PathBuf::from("data/dump"),
            },
            embeddings_path: Some(PathBuf::from("data/glove")),
            init_params_path: None,
        }
    }
}

/// Where checkpoints go
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parameter checkpoint, rewritten after every training pass
    pub param_dump_path: Option<PathBuf>,
    /// Metrics record, rewritten after every epoch
    pub metrics_dump_path: Option<PathBuf>,
}

impl OutputConfig {
    /// Conventional `params.safetensors` / `metrics.json` pair inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            param_dump_path: Some(dir.join("params.safetensors")),
            metrics_dump_path: Some(dir.join("metrics.json")),
        }
    }
}
