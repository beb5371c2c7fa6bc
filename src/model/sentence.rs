//! Segmented sentences and evidence sets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentence id: the 0-based position of the sentence in its corpus.
pub type SentenceId = usize;

/// Identity of the document a corpus and its page cache belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a document id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A segmented sentence of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Stable id (position in the corpus)
    pub id: SentenceId,
    /// Plain sentence text
    pub text: String,
}

/// The ordered sentence corpus of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceCorpus {
    sentences: Vec<Sentence>,
}

impl SentenceCorpus {
    /// Build a corpus from ordered sentence texts; ids are assigned `0..n`.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sentences = texts
            .into_iter()
            .enumerate()
            .map(|(id, text)| Sentence {
                id,
                text: text.into(),
            })
            .collect();
        Self { sentences }
    }

    /// Sentence by id.
    pub fn get(&self, id: SentenceId) -> Option<&Sentence> {
        self.sentences.get(id)
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Whether the corpus has no sentences.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Sentences in id order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    /// Sentences as a slice.
    pub fn as_slice(&self) -> &[Sentence] {
        &self.sentences
    }
}

/// Evidence sentences referenced by one answer. Read-only input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSet {
    /// Referenced sentence ids, in the order the answer cites them
    pub sentence_ids: Vec<SentenceId>,
}

impl EvidenceSet {
    /// Create an evidence set.
    pub fn new(sentence_ids: Vec<SentenceId>) -> Self {
        Self { sentence_ids }
    }

    /// Whether no sentence is referenced.
    pub fn is_empty(&self) -> bool {
        self.sentence_ids.is_empty()
    }
}
