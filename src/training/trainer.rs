//! One online training pass over a sequence of examples

use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::TreeModel;
use crate::training::data::Example;

/// Running arithmetic mean updated one value at a time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    mean: f64,
    weight: f64,
    count: usize,
}

impl RunningMean {
    /// Empty mean
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one value: `mean += (value - mean) / n`
    pub fn update(&mut self, value: f64) -> f64 {
        self.update_weighted(value, 1.0)
    }

    /// Fold in a value standing for `weight` observations, such as the mean
    /// loss of a whole batch
    pub fn update_weighted(&mut self, value: f64, weight: f64) -> f64 {
        self.count += 1;
        self.weight += weight;
        if self.weight > 0.0 {
            self.mean += (value - self.mean) * weight / self.weight;
        }
        self.mean
    }

    /// Current mean, zero before any update
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of updates
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Train on every example in order and return the mean per-example loss.
///
/// The model chooses its own target, so no label is passed to
/// [`TreeModel::train_step`].
#[instrument(skip_all, fields(examples = examples.len()))]
pub fn train_dataset<M: TreeModel + ?Sized>(model: &mut M, examples: &[Example]) -> Result<f64> {
    if examples.is_empty() {
        return Err(Error::empty_dataset("training set"));
    }

    let total = examples.len();
    let mut avg_loss = RunningMean::new();
    for (i, example) in examples.iter().enumerate() {
        let step = model.train_step(&example.tree, None)?;
        let avg = avg_loss.update(step.loss);
        debug!("avg loss {:.4} at example {} of {}", avg, i + 1, total);
    }

    Ok(avg_loss.mean())
}
