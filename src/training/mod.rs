//! Training and evaluation orchestration for tree sentiment models
//!
//! # Main Components
//!
//! - **Data**: labeled examples, in-memory and chunked dataset layouts
//! - **Trainer**: one online pass over a sequence of examples
//! - **Evaluator**: accuracy, F1, confusion matrix and lagged profit
//! - **Metrics**: append-only per-epoch record and its exporters
//! - **Checkpoints**: parameter dumps after every training pass
//! - **Session**: epoch loop tying everything together
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use treesent::config::Config;
//! use treesent::training::TrainingSession;
//!
//! let config = Config::from_file("session.yaml")?;
//! let mut session = TrainingSession::from_config(config, None)?;
//! let outcome = session.run()?;
//! println!("final dev accuracy {:?}", outcome.metrics.dev_accuracy().last());
//! ```

pub mod checkpoints;
pub mod data;
pub mod evaluator;
pub mod metrics;
pub mod session;
pub mod trainer;

#[cfg(test)]
pub mod tests;

pub use checkpoints::CheckpointManager;
pub use data::{DataError, Dataset, DatasetSource, Example, LabelCounts, TrainPartition};
pub use evaluator::{eval_with_lags, evaluate_dataset, evaluate_model, predict_root, Evaluation};
pub use metrics::{ConfusionMatrix, MetricsExporter, MetricsRecord, MetricsTracker};
pub use session::{load_model, ParamSource, SessionOutcome, TrainingSession};
pub use trainer::{train_dataset, RunningMean};
