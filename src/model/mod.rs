//! Tree-structured sentiment models
//!
//! The trainer and evaluator only ever talk to a model through the
//! [`TreeModel`] trait. [`TreeLstm`] is the bundled implementation.

use std::path::Path;

use crate::error::Result;

pub mod adadelta;
pub mod params;
pub mod tree;
pub mod tree_lstm;
pub mod vocab;

pub use params::{ModelParams, ParamTensor};
pub use tree::{Tree, TreeNode};
pub use tree_lstm::TreeLstm;
pub use vocab::Vocabulary;

/// Number of sentiment classes: negative, neutral, positive
pub const NUM_LABELS: usize = 3;

/// Children per node the bundled model is built for (binarized parses)
pub const MAX_DEGREE: usize = 2;

/// Outcome of one online update
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Loss of the example before the update
    pub loss: f64,
    /// Root class probabilities before the update
    pub prediction: Vec<f32>,
}

/// Capabilities a model must offer to be driven by the training session.
#[cfg_attr(test, mockall::automock)]
pub trait TreeModel {
    /// Number of label classes scored per node
    fn output_dim(&self) -> usize;

    /// Seed the embedding table from a pretrained vector source
    fn initialize_embeddings(&mut self, vocab: &Vocabulary, source: &Path) -> Result<()>;

    /// Snapshot of all parameters
    fn params(&self) -> Result<ModelParams>;

    /// Replace all parameters
    fn set_params(&mut self, params: &ModelParams) -> Result<()>;

    /// Snapshot parameters and write them to `path`
    fn save_params(&self, path: &Path) -> Result<ModelParams> {
        let params = self.params()?;
        params.save(path)?;
        Ok(params)
    }

    /// Replace all parameters from a checkpoint file
    fn load_params(&mut self, path: &Path) -> Result<()> {
        let params = ModelParams::load(path)?;
        self.set_params(&params)
    }

    /// One online parameter update on a single tree.
    ///
    /// When `label` is `None` the model picks its own target from the tree.
    fn train_step(&mut self, tree: &Tree, label: Option<usize>) -> Result<StepOutput>;

    /// Class scores for every node in tree order, root last
    fn predict(&self, tree: &Tree) -> Result<Vec<Vec<f32>>>;
}
