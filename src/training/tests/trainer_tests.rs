//! Tests for the online training pass

use approx::assert_relative_eq;
use proptest::prelude::*;

use crate::error::Error;
use crate::model::{MockTreeModel, StepOutput, TreeModel};
use crate::training::trainer::{train_dataset, RunningMean};

use super::fixtures::ScriptedModel;
use super::mock_data::create_mock_examples;

proptest! {
    #[test]
    fn incremental_mean_equals_batch_mean(losses in prop::collection::vec(0.0f64..50.0, 1..200)) {
        let examples = create_mock_examples(losses.len());
        let mut model = ScriptedModel::with_losses(losses.clone());

        let avg = train_dataset(&mut model, &examples).unwrap();
        let expected = losses.iter().sum::<f64>() / losses.len() as f64;
        prop_assert!((avg - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn weighted_updates_match_flattened_mean(
        batches in prop::collection::vec(prop::collection::vec(0.0f64..10.0, 1..20), 1..10)
    ) {
        let mut by_batch = RunningMean::new();
        let mut flat = RunningMean::new();
        for batch in &batches {
            let batch_mean = batch.iter().sum::<f64>() / batch.len() as f64;
            by_batch.update_weighted(batch_mean, batch.len() as f64);
            for &loss in batch {
                flat.update(loss);
            }
        }
        prop_assert!((by_batch.mean() - flat.mean()).abs() < 1e-9);
    }
}

#[test]
fn running_mean_starts_at_zero() {
    let mut mean = RunningMean::new();
    assert_eq!(mean.mean(), 0.0);
    assert_eq!(mean.count(), 0);

    mean.update(2.0);
    mean.update(4.0);
    assert_relative_eq!(mean.mean(), 3.0);
    assert_eq!(mean.count(), 2);
}

#[test]
fn trains_every_example_once_in_order_without_labels() {
    let examples = create_mock_examples(7);
    let mut model = ScriptedModel::new();

    train_dataset(&mut model, &examples).unwrap();

    assert_eq!(model.steps, 7);
    assert_eq!(model.labels_seen, vec![None; 7]);
}

#[test]
fn passes_each_tree_to_the_model() {
    let examples = create_mock_examples(3);
    let expected: Vec<_> = examples.iter().map(|e| e.tree.clone()).collect();

    let mut model = MockTreeModel::new();
    let mut seq = mockall::Sequence::new();
    for (tree, loss) in expected.into_iter().zip([0.5, 1.5, 1.0]) {
        model
            .expect_train_step()
            .withf(move |t, label| *t == tree && label.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| {
                Ok(StepOutput {
                    loss,
                    prediction: vec![0.2, 0.3, 0.5],
                })
            });
    }

    let avg = train_dataset(&mut model, &examples).unwrap();
    assert_relative_eq!(avg, 1.0);
}

#[test]
fn empty_training_set_is_an_error() {
    let mut model = ScriptedModel::new();
    assert!(matches!(train_dataset(&mut model, &[]), Err(Error::EmptyDataset(_))));
    assert_eq!(model.steps, 0);
}

#[test]
fn model_failure_propagates() {
    let examples = create_mock_examples(3);
    let mut model = MockTreeModel::new();
    model
        .expect_train_step()
        .times(1)
        .returning(|_, _| Err(Error::model("cannot score tree")));

    assert!(matches!(train_dataset(&mut model, &examples), Err(Error::Model(_))));
}

#[test]
fn works_through_a_trait_object() {
    let examples = create_mock_examples(4);
    let mut model: Box<dyn TreeModel> = Box::new(ScriptedModel::new());
    let avg = train_dataset(model.as_mut(), &examples).unwrap();
    assert!(avg > 0.0);
}
