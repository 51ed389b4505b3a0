//! Held-out evaluation of a tree model
//!
//! Every example is scored by the prediction at its tree root, which is the
//! last vector returned by [`TreeModel::predict`].

use std::path::Path;

use tracing::{info, instrument};

use crate::config::F1Mode;
use crate::error::{Error, Result};
use crate::model::TreeModel;
use crate::training::data::{read_examples, validate_partition, DataError, Example};
use crate::training::metrics::ConfusionMatrix;
use crate::utils::math::argmax;

/// Label treated as the positive class by binary F1
pub const POSITIVE_LABEL: usize = 2;

/// Result of one evaluation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Fraction of roots predicted correctly
    pub accuracy: f64,
    /// F1 under the requested [`F1Mode`]
    pub f1_score: f64,
    /// Counts indexed `[true][predicted]`, fresh for this pass
    pub conf_matrix: ConfusionMatrix,
    /// Mean of `(predicted - 1) * lag`, only for lagged evaluation
    pub mean_profit: Option<f64>,
}

/// Predicted label of the tree root
pub fn predict_root<M: TreeModel + ?Sized>(model: &M, example: &Example) -> Result<usize> {
    let scores = model.predict(&example.tree)?;
    let root = scores
        .last()
        .ok_or_else(|| Error::model("model returned no node predictions"))?;
    argmax(root).ok_or_else(|| Error::model("root prediction has no scores"))
}

/// Accuracy, F1 and confusion matrix over labeled examples
#[instrument(skip_all, fields(examples = examples.len()))]
pub fn evaluate_dataset<M: TreeModel + ?Sized>(
    model: &M,
    examples: &[Example],
    f1_mode: F1Mode,
) -> Result<Evaluation> {
    let (conf_matrix, _) = score(model, examples)?;
    Ok(summarize(conf_matrix, f1_mode, None))
}

/// [`evaluate_dataset`] plus the mean profit of betting on the predicted
/// direction. Every example must carry a lag.
#[instrument(skip_all, fields(examples = examples.len()))]
pub fn eval_with_lags<M: TreeModel + ?Sized>(
    model: &M,
    examples: &[Example],
    f1_mode: F1Mode,
) -> Result<Evaluation> {
    let lags = examples
        .iter()
        .enumerate()
        .map(|(index, e)| e.lag.ok_or(DataError::MissingLag { index }))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let (conf_matrix, predictions) = score(model, examples)?;
    let total_profit: f64 = predictions
        .iter()
        .zip(&lags)
        .map(|(&pred, &lag)| (pred as f64 - 1.0) * lag)
        .sum();
    let mean_profit = total_profit / examples.len() as f64;

    Ok(summarize(conf_matrix, f1_mode, Some(mean_profit)))
}

/// Evaluate a validation file, with profit when every example has a lag
pub fn evaluate_model<M: TreeModel + ?Sized>(
    model: &M,
    validation_path: &Path,
    f1_mode: F1Mode,
) -> Result<Evaluation> {
    let mut examples = read_examples(validation_path)?;
    if examples.is_empty() {
        return Err(Error::empty_dataset(validation_path.to_string_lossy()));
    }
    let partition = validation_path.to_string_lossy();
    let counts = validate_partition(&mut examples, &partition)?;
    info!("validation {} ({})", examples.len(), counts);

    let lagged = examples.iter().filter(|e| e.lag.is_some()).count();
    if lagged == examples.len() {
        eval_with_lags(model, &examples, f1_mode)
    } else if lagged == 0 {
        evaluate_dataset(model, &examples, f1_mode)
    } else {
        let index = examples.iter().position(|e| e.lag.is_none()).unwrap_or_default();
        Err(DataError::MissingLag { index }.into())
    }
}

fn score<M: TreeModel + ?Sized>(
    model: &M,
    examples: &[Example],
) -> Result<(ConfusionMatrix, Vec<usize>)> {
    if examples.is_empty() {
        return Err(Error::empty_dataset("evaluation set"));
    }

    let mut conf_matrix = ConfusionMatrix::new(model.output_dim());
    let mut predictions = Vec::with_capacity(examples.len());
    for example in examples {
        let predicted = predict_root(model, example)?;
        conf_matrix.record(example.label, predicted)?;
        predictions.push(predicted);
    }
    Ok((conf_matrix, predictions))
}

fn summarize(conf_matrix: ConfusionMatrix, f1_mode: F1Mode, mean_profit: Option<f64>) -> Evaluation {
    let accuracy = conf_matrix.correct() as f64 / conf_matrix.total() as f64;
    let f1_score = match f1_mode {
        F1Mode::Observed if conf_matrix.observed_labels() <= 2 => conf_matrix.f1_for(POSITIVE_LABEL),
        _ => conf_matrix.weighted_f1(),
    };

    Evaluation {
        accuracy,
        f1_score,
        conf_matrix,
        mean_profit,
    }
}
