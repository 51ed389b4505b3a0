//! Training session: vocabulary, dataset, model and parameter source wired
//! together and driven through a fixed number of epochs.
//!
//! Each epoch trains on the whole training partition (batch by batch in
//! chunked mode), checkpoints parameters after every training pass,
//! evaluates on the full dev set and appends one entry to the metrics record.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::config::{Config, F1Mode, ModelConfig};
use crate::error::{Error, Result};
use crate::model::{ModelParams, TreeLstm, TreeModel, Vocabulary, NUM_LABELS};
use crate::training::checkpoints::CheckpointManager;
use crate::training::data::{load_batch, Dataset, Example, TrainPartition};
use crate::training::evaluator::{evaluate_dataset, Evaluation};
use crate::training::metrics::{MetricsRecord, MetricsTracker};
use crate::training::trainer::{train_dataset, RunningMean};

/// Where a session's starting parameters come from
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Parameters handed over by the caller
    Injected(ModelParams),
    /// Parameter checkpoint on disk
    Loaded(PathBuf),
    /// Fresh initialization with embeddings read from pretrained vectors
    FreshFromEmbeddings(PathBuf),
}

impl ParamSource {
    /// Pick the first available source in the order injected, loaded, fresh.
    ///
    /// Lower-priority sources that were also given are ignored with a warning.
    pub fn resolve(
        injected: Option<ModelParams>,
        load_path: Option<PathBuf>,
        embeddings_path: Option<PathBuf>,
    ) -> Result<Self> {
        let source = match (injected, load_path, embeddings_path) {
            (Some(params), load, emb) => {
                if load.is_some() || emb.is_some() {
                    warn!("Injected parameters take precedence; ignoring checkpoint and embedding paths");
                }
                Self::Injected(params)
            }
            (None, Some(path), emb) => {
                if emb.is_some() {
                    warn!("Loading parameters from {:?}; ignoring embedding path", path);
                }
                Self::Loaded(path)
            }
            (None, None, Some(path)) => Self::FreshFromEmbeddings(path),
            (None, None, None) => {
                return Err(Error::config(
                    "No parameter source: inject parameters, set init_params_path or embeddings_path",
                ))
            }
        };
        Ok(source)
    }

    /// Put the model into its starting state
    pub fn apply<M: TreeModel + ?Sized>(&self, model: &mut M, vocab: &Vocabulary) -> Result<()> {
        match self {
            Self::Injected(params) => {
                info!("Using injected parameters");
                model.set_params(params)
            }
            Self::Loaded(path) => {
                info!("Loading parameters from {:?}", path);
                model.load_params(path)
            }
            Self::FreshFromEmbeddings(path) => {
                info!("Initializing embeddings from {:?}", path);
                model.initialize_embeddings(vocab, path)
            }
        }
    }
}

/// Final state of a finished session
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Parameters after the last epoch
    pub params: ModelParams,
    /// One entry per epoch
    pub metrics: MetricsRecord,
}

/// A fully initialized training run
pub struct TrainingSession<M: TreeModel> {
    config: Config,
    vocab: Vocabulary,
    dataset: Dataset,
    model: M,
    checkpoints: CheckpointManager,
    tracker: MetricsTracker,
}

impl<M: TreeModel> TrainingSession<M> {
    /// Assemble a session and initialize the model from `source`
    pub fn new(
        config: Config,
        vocab: Vocabulary,
        dataset: Dataset,
        mut model: M,
        source: ParamSource,
    ) -> Result<Self> {
        config.validate()?;
        if model.output_dim() != NUM_LABELS {
            return Err(Error::config(format!(
                "Model scores {} classes, expected {}",
                model.output_dim(),
                NUM_LABELS
            )));
        }

        source.apply(&mut model, &vocab)?;

        Ok(Self {
            checkpoints: CheckpointManager::new(config.output.param_dump_path.clone()),
            tracker: MetricsTracker::from_output(&config.output),
            config,
            vocab,
            dataset,
            model,
        })
    }

    /// Replace the metrics tracker
    pub fn with_tracker(mut self, tracker: MetricsTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Vocabulary the model was built for
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Model in its current state
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Take the model out of the session
    pub fn into_model(self) -> M {
        self.model
    }

    /// Metrics recorded so far
    pub fn metrics(&self) -> &MetricsRecord {
        self.tracker.record()
    }

    /// Number of metrics exports that failed so far
    pub fn metrics_export_failures(&self) -> usize {
        self.tracker.export_failures()
    }

    /// Number of parameter dumps written so far
    pub fn checkpoint_saves(&self) -> usize {
        self.checkpoints.saves()
    }

    /// Run every configured epoch and return the final parameters and metrics
    #[instrument(skip(self), fields(epochs = self.config.training.num_epochs))]
    pub fn run(&mut self) -> Result<SessionOutcome> {
        let Self {
            config,
            dataset,
            model,
            checkpoints,
            tracker,
            ..
        } = self;

        let num_epochs = config.training.num_epochs;
        let f1_mode = config.training.f1_mode;
        info!(
            "Session started at {}: {} epochs, {} training examples in {} pass(es), {} dev examples",
            Utc::now().to_rfc3339(),
            num_epochs,
            dataset.train_count(),
            dataset.num_batches(),
            dataset.dev().len()
        );

        for epoch in 1..=num_epochs {
            info!("Epoch {} of {}", epoch, num_epochs);

            let (avg_loss, evaluation) = match dataset.train() {
                TrainPartition::InMemory(examples) => {
                    let avg_loss = train_dataset(model, examples)?;
                    checkpoints.persist(&*model)?;
                    let evaluation = evaluate_dataset(&*model, dataset.dev(), f1_mode)?;
                    (avg_loss, evaluation)
                }
                TrainPartition::Chunked(files) => {
                    let epochs_left = num_epochs - epoch;
                    chunked_epoch(model, checkpoints, files, dataset.dev(), f1_mode, epochs_left)?
                }
            };

            info!(
                "Epoch {}: avg loss {:.4}, dev accuracy {:.4}, F1 {:.4}",
                epoch, avg_loss, evaluation.accuracy, evaluation.f1_score
            );
            tracker.track(avg_loss, &evaluation);
        }

        Ok(SessionOutcome {
            params: model.params()?,
            metrics: tracker.record().clone(),
        })
    }
}

impl TrainingSession<TreeLstm> {
    /// Session around a fresh [`TreeLstm`] sized for `vocab`
    pub fn with_tree_lstm(
        config: Config,
        vocab: Vocabulary,
        dataset: Dataset,
        source: ParamSource,
    ) -> Result<Self> {
        let model = TreeLstm::new(vocab.size(), &config.model)?;
        Self::new(config, vocab, dataset, model, source)
    }

    /// Load vocabulary and dataset named by `config` and build the session.
    ///
    /// `injected` takes precedence over the configured checkpoint and
    /// embedding paths.
    pub fn from_config(config: Config, injected: Option<ModelParams>) -> Result<Self> {
        config.validate()?;
        let vocab = Vocabulary::load(&config.data.vocab_path)?;
        let dataset = Dataset::load(&config.data.source)?;
        let source = ParamSource::resolve(
            injected,
            config.data.init_params_path.clone(),
            config.data.embeddings_path.clone(),
        )?;
        Self::with_tree_lstm(config, vocab, dataset, source)
    }
}

/// Build a [`TreeLstm`] for the vocabulary at `vocab_path` and load its
/// parameters from `params_path`
pub fn load_model(vocab_path: &Path, params_path: &Path, config: &ModelConfig) -> Result<TreeLstm> {
    let vocab = Vocabulary::load(vocab_path)?;
    TreeLstm::from_checkpoint(&vocab, params_path, config)
}

fn chunked_epoch<M: TreeModel + ?Sized>(
    model: &mut M,
    checkpoints: &mut CheckpointManager,
    files: &[PathBuf],
    dev: &[Example],
    f1_mode: F1Mode,
    epochs_left: usize,
) -> Result<(f64, Evaluation)> {
    let num_batches = files.len();
    let mut epoch_loss = RunningMean::new();
    let mut last_evaluation = None;

    for (batch_nr, path) in files.iter().enumerate() {
        let started = Instant::now();

        let batch = load_batch(path)?;
        let batch_loss = train_dataset(model, &batch)?;
        epoch_loss.update_weighted(batch_loss, batch.len() as f64);
        checkpoints.persist(&*model)?;

        let evaluation = evaluate_dataset(&*model, dev, f1_mode)?;
        info!(
            "Batch {} of {}: loss {:.4}, dev accuracy {:.4}, F1 {:.4}",
            batch_nr + 1,
            num_batches,
            batch_loss,
            evaluation.accuracy,
            evaluation.f1_score
        );
        last_evaluation = Some(evaluation);

        let remaining = num_batches - batch_nr - 1 + epochs_left * num_batches;
        info!(
            "Estimated time remaining: {}",
            format_eta(started.elapsed(), remaining)
        );
    }

    let evaluation = last_evaluation.ok_or_else(|| Error::empty_dataset("training batches"))?;
    Ok((epoch_loss.mean(), evaluation))
}

fn format_eta(batch_time: Duration, batches_left: usize) -> String {
    let secs = batch_time.as_secs_f64() * batches_left as f64;
    let total = secs.round() as u64;
    format!("{}h {:02}m {:02}s", total / 3600, (total % 3600) / 60, total % 60)
}
