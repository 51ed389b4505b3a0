//! Test utilities and helper functions

use std::path::Path;

use crate::config::{Config, ModelConfig, OutputConfig};
use crate::model::NUM_LABELS;
use crate::training::data::DatasetSource;
use crate::training::metrics::MetricsRecord;

/// Tiny Tree-LSTM dimensions
pub fn small_model_config() -> ModelConfig {
    ModelConfig {
        embedding_dim: 4,
        hidden_dim: 3,
        learning_rate: 0.05,
        ..ModelConfig::default()
    }
}

/// Session config over `source` writing outputs into `out_dir`
pub fn test_config(source: DatasetSource, num_epochs: usize, out_dir: &Path) -> Config {
    let mut config = Config {
        model: small_model_config(),
        output: OutputConfig::in_dir(out_dir),
        ..Config::default()
    };
    config.training.num_epochs = num_epochs;
    config.data.source = source;
    config.data.embeddings_path = None;
    config
}

/// Every sequence has one entry per epoch and every value is in range
pub fn assert_metrics_valid(record: &MetricsRecord, epochs: usize) {
    assert_eq!(record.len(), epochs);
    assert_eq!(record.avg_loss().len(), epochs);
    assert_eq!(record.dev_accuracy().len(), epochs);
    assert_eq!(record.f1_score().len(), epochs);
    assert_eq!(record.conf_matrix().len(), epochs);

    for i in 0..epochs {
        assert!(record.avg_loss()[i].is_finite() && record.avg_loss()[i] >= 0.0);
        assert!((0.0..=1.0).contains(&record.dev_accuracy()[i]));
        assert!((0.0..=1.0).contains(&record.f1_score()[i]));
        assert_eq!(record.conf_matrix()[i].num_labels(), NUM_LABELS);
    }
}
