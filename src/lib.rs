//! treesent - Tree-LSTM sentiment training and evaluation
//!
//! This crate trains a tree-structured LSTM over parsed sentences and
//! evaluates it on held-out data, optionally scoring the predicted sentiment
//! direction against a price-lag signal.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

// Re-exports
pub use config::{Config, F1Mode, ModelConfig, OptimizerType};
pub use error::{Error, Result};
pub use model::{ModelParams, Tree, TreeLstm, TreeModel, TreeNode, Vocabulary};
pub use training::{
    evaluate_model, load_model, Dataset, DatasetSource, Evaluation, Example, MetricsRecord,
    ParamSource, SessionOutcome, TrainingSession,
};
