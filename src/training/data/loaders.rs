//! File loaders for example batches

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{DataError, Example, LabelCounts};
use crate::model::NUM_LABELS;
use crate::utils::io::write_file_atomic;

fn is_binary(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("bin")
}

/// Deserialize a data file; `.bin` is bincode, everything else JSON
pub(crate) fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::DatasetNotFound {
            path: path.to_string_lossy().to_string(),
        },
        _ => DataError::IoError(e),
    })?;
    let reader = BufReader::new(file);

    if is_binary(path) {
        Ok(bincode::deserialize_from(reader)?)
    } else {
        Ok(serde_json::from_reader(reader)?)
    }
}

pub(crate) fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<(), DataError> {
    let bytes = if is_binary(path) {
        bincode::serialize(value)?
    } else {
        serde_json::to_vec(value)?
    };
    write_file_atomic(path, &bytes)?;
    Ok(())
}

/// Read one batch file of examples (unvalidated)
#[instrument]
pub fn read_examples(path: &Path) -> Result<Vec<Example>, DataError> {
    let examples: Vec<Example> = read_file(path)?;
    debug!("Read {} examples from {:?}", examples.len(), path);
    Ok(examples)
}

/// Write a batch file of examples
pub fn write_examples(path: &Path, examples: &[Example]) -> Result<(), DataError> {
    write_file(path, &examples)
}

/// Batch files directly inside `dir`, sorted by name.
///
/// Hidden files and leftover `.tmp` files are ignored.
pub fn list_batch_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    if !dir.is_dir() {
        return Err(DataError::DatasetNotFound {
            path: dir.to_string_lossy().to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_file() && !name.starts_with('.') && !name.ends_with(".tmp") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read several batch files and concatenate them in the given order
pub fn load_and_concatenate(paths: &[PathBuf]) -> Result<Vec<Example>, DataError> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(read_examples(path)?);
    }
    Ok(all)
}

/// Check the label domain of a partition and mirror each example label
/// onto its tree root.
///
/// A root already labeled differently from its example is rejected.
pub fn validate_partition(examples: &mut [Example], partition: &str) -> Result<LabelCounts, DataError> {
    let mut counts = LabelCounts::default();

    for (index, example) in examples.iter_mut().enumerate() {
        if example.label >= NUM_LABELS {
            return Err(DataError::InvalidLabel {
                partition: partition.to_string(),
                index,
                label: example.label,
            });
        }

        match example.tree.root_label() {
            None => example.tree.set_root_label(example.label),
            Some(root_label) if root_label != example.label => {
                return Err(DataError::LabelMismatch {
                    partition: partition.to_string(),
                    index,
                    label: example.label,
                    root_label,
                });
            }
            Some(_) => {}
        }

        counts.0[example.label] += 1;
    }

    Ok(counts)
}
