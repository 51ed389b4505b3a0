//! Test suite for the training orchestration layer
//!
//! Covers data loading, the trainer pass, evaluation, metrics persistence,
//! checkpointing and whole training sessions, using a deterministic scripted
//! model where the real network would obscure what is being checked.

pub mod data_tests;
pub mod trainer_tests;

// Utility modules for testing
pub mod fixtures;
pub mod mock_data;
pub mod test_utils;

pub use fixtures::{DataTestFixture, ScriptedModel};
pub use mock_data::{create_mock_examples, labeled, sentence, toy_vocab, write_glove};
pub use test_utils::{assert_metrics_valid, small_model_config, test_config};
