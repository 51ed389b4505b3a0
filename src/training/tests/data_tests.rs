//! Tests for data loading functionality

use crate::model::{Tree, TreeNode};
use crate::training::data::{
    list_batch_files, load_batch, read_examples, validate_partition, write_examples, DataError, Dataset,
    DatasetSource, Example, TrainPartition,
};

use super::fixtures::DataTestFixture;
use super::mock_data::{create_mock_examples, labeled, sentence};

#[test]
fn examples_round_trip_as_json_and_bincode() {
    let fixture = DataTestFixture::new();
    let mut examples = create_mock_examples(5);
    examples.push(Example::with_lag(sentence(&[1, 2]), 2, -0.125));

    for name in ["batch.json", "batch.bin"] {
        let path = fixture.path().join(name);
        write_examples(&path, &examples).unwrap();
        assert_eq!(read_examples(&path).unwrap(), examples, "{name}");
    }
}

#[test]
fn lag_is_optional_in_json() {
    let fixture = DataTestFixture::new();
    let path = fixture.path().join("plain.json");
    std::fs::write(&path, r#"[{"tree": [{"word": 3}], "label": 1}]"#).unwrap();

    let examples = read_examples(&path).unwrap();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].lag, None);
    assert_eq!(examples[0].tree, Tree::leaf(3));
}

#[test]
fn malformed_tree_in_file_is_rejected() {
    let fixture = DataTestFixture::new();
    let path = fixture.path().join("bad_tree.json");
    // child index points forward
    std::fs::write(&path, r#"[{"tree": [{"children": [1]}, {"word": 0}], "label": 0}]"#).unwrap();

    assert!(matches!(read_examples(&path), Err(DataError::SerializationError(_))));
}

#[test]
fn missing_file_is_dataset_not_found() {
    let fixture = DataTestFixture::new();
    let result = read_examples(&fixture.path().join("nope.json"));
    assert!(matches!(result, Err(DataError::DatasetNotFound { .. })));
}

#[test]
fn batch_files_are_listed_in_name_order() {
    let fixture = DataTestFixture::new();
    let dir = fixture.path().join("train");
    std::fs::create_dir_all(&dir).unwrap();
    for name in ["batch_10.json", "batch_02.json", ".hidden", "batch_01.json", "batch_03.json.tmp"] {
        std::fs::write(dir.join(name), b"[]").unwrap();
    }

    let names: Vec<_> = list_batch_files(&dir)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["batch_01.json", "batch_02.json", "batch_10.json"]);
}

#[test]
fn validation_copies_label_onto_root() {
    let mut examples = vec![Example::new(sentence(&[0, 1]), 2), Example::new(sentence(&[3]), 0)];
    let counts = validate_partition(&mut examples, "train").unwrap();

    assert_eq!(counts.0, [1, 0, 1]);
    assert_eq!(examples[0].tree.root_label(), Some(2));
    assert_eq!(examples[1].tree.root_label(), Some(0));
}

#[test]
fn label_outside_domain_is_fatal() {
    let mut examples = vec![labeled(&[0], 1), Example::new(sentence(&[1]), 3)];
    let result = validate_partition(&mut examples, "dev");
    assert!(matches!(
        result,
        Err(DataError::InvalidLabel { index: 1, label: 3, .. })
    ));
}

#[test]
fn conflicting_root_label_is_rejected() {
    let tree = Tree::new(vec![TreeNode::leaf(0).with_label(0)]).unwrap();
    let mut examples = vec![Example::new(tree, 2)];
    assert!(matches!(
        validate_partition(&mut examples, "train"),
        Err(DataError::LabelMismatch { label: 2, root_label: 0, .. })
    ));
}

#[test]
fn split_file_ignores_extra_keys() {
    let fixture = DataTestFixture::new();
    let source = fixture.split_file(&create_mock_examples(4), &create_mock_examples(2));

    let dataset = Dataset::load(&source).unwrap();
    assert!(!dataset.is_chunked());
    assert_eq!(dataset.train_count(), 4);
    assert_eq!(dataset.dev().len(), 2);
    assert_eq!(dataset.num_batches(), 1);
}

#[test]
fn separate_files_load_in_memory() {
    let fixture = DataTestFixture::new();
    let source = fixture.separate_files(&create_mock_examples(3), &create_mock_examples(1));

    let dataset = Dataset::load(&source).unwrap();
    match dataset.train() {
        TrainPartition::InMemory(train) => assert_eq!(train.len(), 3),
        TrainPartition::Chunked(_) => panic!("expected in-memory training data"),
    }
}

#[test]
fn chunked_layout_concatenates_dev_and_keeps_train_on_disk() {
    let fixture = DataTestFixture::new();
    let all = create_mock_examples(7);
    let source = fixture.chunked(
        &[all[..3].to_vec(), all[3..5].to_vec(), all[5..].to_vec()],
        &[create_mock_examples(2), create_mock_examples(1)],
        "bin",
    );

    let dataset = Dataset::load(&source).unwrap();
    assert!(dataset.is_chunked());
    assert_eq!(dataset.num_batches(), 3);
    assert_eq!(dataset.train_count(), 7);
    assert_eq!(dataset.dev().len(), 3);

    let TrainPartition::Chunked(files) = dataset.train() else {
        panic!("expected batch files");
    };
    assert_eq!(load_batch(&files[1]).unwrap(), all[3..5].to_vec());
}

#[test]
fn chunked_layout_rejects_bad_label_in_any_batch() {
    let fixture = DataTestFixture::new();
    let bad = vec![Example::new(sentence(&[0]), 5)];
    let source = fixture.chunked(&[create_mock_examples(2), bad], &[create_mock_examples(1)], "json");

    assert!(matches!(
        Dataset::load(&source),
        Err(DataError::InvalidLabel { label: 5, .. })
    ));
}

#[test]
fn empty_partition_is_rejected() {
    let fixture = DataTestFixture::new();
    let source = fixture.separate_files(&[], &create_mock_examples(1));
    assert!(matches!(
        Dataset::load(&source),
        Err(DataError::EmptyPartition { .. })
    ));
}

#[test]
fn missing_chunk_directory_is_reported() {
    let fixture = DataTestFixture::new();
    let source = DatasetSource::Chunked {
        root: fixture.path().join("absent"),
    };
    assert!(matches!(
        Dataset::load(&source),
        Err(DataError::DatasetNotFound { .. })
    ));
}

#[test]
fn dataset_source_reads_from_yaml() {
    let source: DatasetSource = serde_yaml::from_str("layout: split_file\npath: data/sst.json\n").unwrap();
    assert_eq!(
        source,
        DatasetSource::SplitFile {
            path: "data/sst.json".into()
        }
    );
}
