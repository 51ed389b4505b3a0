//! Error types for the treesent system

use thiserror::Error;

use crate::training::data::DataError;

/// Main error type for treesent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model could not score or train on an input
    #[error("Model error: {0}")]
    Model(String),

    /// A partition with no examples reached training or evaluation
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dataset loading or validation error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Tensor operation error
    #[error("Tensor operation error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Parameter checkpoint format error
    #[error("Checkpoint format error: {0}")]
    Checkpoint(#[from] safetensors::SafeTensorError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for treesent operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create an empty dataset error naming the partition
    pub fn empty_dataset(partition: impl Into<String>) -> Self {
        Self::EmptyDataset(partition.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
