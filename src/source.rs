//! Collaborator interfaces.
//!
//! The engine never fetches anything itself. The host supplies sentences,
//! page fragments and (optionally) the word-consumption signal through these
//! traits. [`InMemorySource`] implements all three over plain collections.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matcher::ConsumptionMap;
use crate::model::{DocumentId, FragmentId, PageNumber, RawFragment, SentenceId};

/// Response of the sentence service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceResponse {
    /// Whether the service found the document
    pub success: bool,
    /// Ordered, 0-indexed sentence texts
    #[serde(default)]
    pub sentences: Vec<String>,
}

/// Supplies the segmented sentence corpus of a document.
pub trait SentenceSource {
    /// Fetch the ordered sentences of a document.
    fn get_sentences(&self, document: &DocumentId) -> Result<SentenceResponse>;
}

/// Supplies positioned fragments of rendered pages.
pub trait FragmentSource {
    /// Fetch the fragments of one page as the renderer reports them.
    fn get_page_fragments(&self, page: PageNumber) -> Result<Vec<RawFragment>>;
}

/// Supplies the optional upstream word-consumption signal.
pub trait WordConsumptionSource {
    /// Consumption of the given fragments by one sentence.
    ///
    /// Fragment ids carry the cache's renumbered reading order.
    /// Fragments without an entry are treated as unconsumed.
    fn get_word_consumption(
        &self,
        sentence_id: SentenceId,
        fragment_ids: &[FragmentId],
    ) -> Result<ConsumptionMap>;
}

/// Collaborator backed by in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: HashMap<DocumentId, Vec<String>>,
    pages: BTreeMap<PageNumber, Vec<RawFragment>>,
    consumption: HashMap<SentenceId, ConsumptionMap>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document's sentences.
    pub fn with_document(mut self, id: DocumentId, sentences: Vec<String>) -> Self {
        self.documents.insert(id, sentences);
        self
    }

    /// Add a page's fragments.
    pub fn with_page(mut self, page: PageNumber, fragments: Vec<RawFragment>) -> Self {
        self.pages.insert(page, fragments);
        self
    }

    /// Add the consumption signal of one sentence.
    pub fn with_consumption(mut self, sentence_id: SentenceId, map: ConsumptionMap) -> Self {
        self.consumption.insert(sentence_id, map);
        self
    }

    /// Page numbers with fragments.
    pub fn page_numbers(&self) -> Vec<PageNumber> {
        self.pages.keys().copied().collect()
    }
}

impl SentenceSource for InMemorySource {
    fn get_sentences(&self, document: &DocumentId) -> Result<SentenceResponse> {
        Ok(match self.documents.get(document) {
            Some(sentences) => SentenceResponse {
                success: true,
                sentences: sentences.clone(),
            },
            None => SentenceResponse::default(),
        })
    }
}

impl FragmentSource for InMemorySource {
    fn get_page_fragments(&self, page: PageNumber) -> Result<Vec<RawFragment>> {
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| Error::Source(format!("page {} is not rendered", page)))
    }
}

impl WordConsumptionSource for InMemorySource {
    fn get_word_consumption(
        &self,
        sentence_id: SentenceId,
        fragment_ids: &[FragmentId],
    ) -> Result<ConsumptionMap> {
        let Some(map) = self.consumption.get(&sentence_id) else {
            return Ok(ConsumptionMap::new());
        };
        Ok(fragment_ids
            .iter()
            .filter_map(|id| map.get(id).map(|c| (*id, c.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RawBox;
    use crate::matcher::Consumption;

    #[test]
    fn test_unknown_document_is_unsuccessful() {
        let source = InMemorySource::new();
        let response = source.get_sentences(&DocumentId::new("missing")).unwrap();
        assert!(!response.success);
        assert!(response.sentences.is_empty());
    }

    #[test]
    fn test_known_document() {
        let source = InMemorySource::new()
            .with_document(DocumentId::new("doc"), vec!["One.".to_string(), "Two.".to_string()]);
        let response = source.get_sentences(&DocumentId::new("doc")).unwrap();
        assert!(response.success);
        assert_eq!(response.sentences.len(), 2);
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let source = InMemorySource::new().with_page(
            1,
            vec![RawFragment {
                text: "x".to_string(),
                page: 1,
                bbox: RawBox::Xywh {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                },
                reading_order: None,
            }],
        );
        assert_eq!(source.get_page_fragments(1).unwrap().len(), 1);
        assert!(matches!(source.get_page_fragments(2), Err(Error::Source(_))));
        assert_eq!(source.page_numbers(), vec![1]);
    }

    #[test]
    fn test_consumption_filtered_to_requested_fragments() {
        let mut map = ConsumptionMap::new();
        map.insert(FragmentId::new(1, 0), Consumption::new(0.9, Vec::new()));
        map.insert(FragmentId::new(1, 5), Consumption::new(0.4, Vec::new()));
        let source = InMemorySource::new().with_consumption(3, map);

        let result = source
            .get_word_consumption(3, &[FragmentId::new(1, 0), FragmentId::new(1, 1)])
            .unwrap();
        assert_eq!(result.len(), 1);
        assert!(source.get_word_consumption(4, &[FragmentId::new(1, 0)]).unwrap().is_empty());
    }
}
