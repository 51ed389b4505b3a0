//! Mock data generation for tests

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::model::{Tree, Vocabulary};
use crate::training::data::Example;

/// Five-token vocabulary
pub fn toy_vocab() -> Vocabulary {
    Vocabulary::from_words(["good", "bad", "movie", "not", "the"]).unwrap()
}

/// Left-branching binary tree over the given token ids
pub fn sentence(words: &[u32]) -> Tree {
    let mut iter = words.iter();
    let first = iter.next().copied().unwrap_or(0);
    iter.fold(Tree::leaf(first), |acc, &w| Tree::join(vec![acc, Tree::leaf(w)]))
}

/// Example whose tree root already carries its label
pub fn labeled(words: &[u32], label: usize) -> Example {
    let mut tree = sentence(words);
    tree.set_root_label(label);
    Example::new(tree, label)
}

/// `n` examples cycling through all labels and vocabulary ids
pub fn create_mock_examples(n: usize) -> Vec<Example> {
    (0..n)
        .map(|i| {
            let words = [(i % 5) as u32, ((i + 2) % 5) as u32, ((i + 3) % 5) as u32];
            labeled(&words[..1 + i % 3], i % 3)
        })
        .collect()
}

/// Write a GloVe-style text file with one vector per token, plus one
/// malformed line, into `dir`
pub fn write_glove(dir: &Path, vocab: &Vocabulary, dim: usize) -> PathBuf {
    let mut content = String::new();
    for (id, word) in vocab.words().iter().enumerate() {
        write!(content, "{word}").unwrap();
        for j in 0..dim {
            write!(content, " {}", (id as f32 + 1.0) * 0.1 - j as f32 * 0.05).unwrap();
        }
        content.push('\n');
    }
    content.push_str("broken 0.1\n");

    let path = dir.join(format!("toy.{dim}d.txt"));
    std::fs::write(&path, content).unwrap();
    path
}
