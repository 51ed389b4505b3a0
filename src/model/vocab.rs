//! Token vocabulary mapping words to embedding indices

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Read-only token vocabulary.
///
/// A token's id is its position in the source list. Blank entries keep
/// their slot but map to no token. Repeated tokens are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabFile", into = "VocabFile")]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, u32>,
}

#[derive(Serialize, Deserialize)]
struct VocabFile {
    words: Vec<String>,
}

impl TryFrom<VocabFile> for Vocabulary {
    type Error = Error;

    fn try_from(file: VocabFile) -> Result<Self> {
        Self::from_words(file.words)
    }
}

impl From<Vocabulary> for VocabFile {
    fn from(vocab: Vocabulary) -> Self {
        Self { words: vocab.words }
    }
}

impl Vocabulary {
    /// Build a vocabulary from tokens in id order
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::default();
        for word in words {
            vocab.push(word.into())?;
        }
        Ok(vocab)
    }

    fn push(&mut self, word: String) -> Result<()> {
        let id = self.words.len() as u32;
        if !word.is_empty() {
            if let Some(first) = self.index.get(&word) {
                return Err(Error::invalid_input(format!(
                    "duplicate token '{word}' at entry {id} (first seen at entry {first})"
                )));
            }
            self.index.insert(word.clone(), id);
        }
        self.words.push(word);
        Ok(())
    }

    /// Load a vocabulary file.
    ///
    /// `.json` files hold a serialized vocabulary; anything else is read as
    /// plain text with one token per line, the line number being the id.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let vocab = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            Self::from_words(content.lines().map(|line| line.trim_end_matches('\r')))?
        };

        info!("Loaded vocabulary of {} tokens from {:?}", vocab.size(), path);
        Ok(vocab)
    }

    /// Write the vocabulary as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        crate::utils::io::write_file_atomic(path, &json)?;
        Ok(())
    }

    /// Number of ids, blank slots included
    pub fn size(&self) -> usize {
        self.words.len()
    }

    /// Id of a token
    pub fn index(&self, word: &str) -> Option<u32> {
        self.index.get(word).copied()
    }

    /// Token for an id
    pub fn word(&self, id: u32) -> Option<&str> {
        self.words
            .get(id as usize)
            .map(String::as_str)
            .filter(|word| !word.is_empty())
    }

    /// Tokens in id order
    pub fn words(&self) -> &[String] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_vocab_ids_follow_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        fs::write(&path, "good\r\nbad\n\nmeh\n").unwrap();

        let vocab = Vocabulary::load(&path).unwrap();
        assert_eq!(vocab.size(), 4);
        assert_eq!(vocab.index("good"), Some(0));
        assert_eq!(vocab.index("bad"), Some(1));
        assert_eq!(vocab.index("meh"), Some(3));
        assert_eq!(vocab.word(2), None);
        assert_eq!(vocab.index(""), None);
        assert_eq!(vocab.index("missing"), None);
    }

    #[test]
    fn text_vocab_rejects_duplicate_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        fs::write(&path, "good\nbad\ngood\nmeh\n").unwrap();

        let err = Vocabulary::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("'good'")));
    }

    #[test]
    fn json_vocab_rejects_duplicate_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        fs::write(&path, r#"{"words": ["a", "b", "a"]}"#).unwrap();

        assert!(matches!(Vocabulary::load(&path), Err(Error::Serialization(_))));
    }

    #[test]
    fn json_vocab_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        let vocab = Vocabulary::from_words(["a", "", "c"]).unwrap();

        vocab.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();

        assert_eq!(loaded, vocab);
        assert_eq!(loaded.index("c"), Some(2));
    }
}
