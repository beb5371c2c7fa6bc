//! Versioned document state.
//!
//! A [`DocumentState`] is an immutable value. Every transition returns a new
//! state with a higher version and shares whatever did not change (corpus,
//! untouched cached pages) through `Arc`. Readers holding an older state keep
//! a consistent snapshot.

use std::sync::Arc;

use crate::cache::PageTextCache;
use crate::geometry::CoordinateSpace;
use crate::locator::SentenceLocator;
use crate::model::{
    DocumentId, MatchType, PageMapping, PageNumber, RawFragment, SentenceCorpus, SentenceId,
    TextFragment,
};
use crate::source::{FragmentSource, SentenceSource};
use crate::stats::MappingStatistics;

/// Immutable snapshot of one document: sentences, cached pages and mappings.
#[derive(Debug, Clone)]
pub struct DocumentState {
    version: u64,
    document_id: Option<DocumentId>,
    corpus: Arc<SentenceCorpus>,
    pages: Arc<PageTextCache>,
    mappings: Arc<[PageMapping]>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocumentState {
    /// State with no document loaded.
    pub fn empty() -> Self {
        Self {
            version: 0,
            document_id: None,
            corpus: Arc::new(SentenceCorpus::default()),
            pages: Arc::new(PageTextCache::new()),
            mappings: Arc::from(Vec::new()),
        }
    }

    /// Load the sentence corpus of a document.
    ///
    /// Switching to a different document drops the page cache. Mappings are
    /// always cleared until [`relocate`](Self::relocate) runs.
    pub fn load_document(&self, id: DocumentId, corpus: SentenceCorpus) -> Self {
        let same_document = self.document_id.as_ref() == Some(&id);
        let pages = if same_document {
            Arc::clone(&self.pages)
        } else {
            if !self.pages.is_empty() {
                log::debug!("Document changed to {}; dropping {} cached pages", id, self.pages.len());
            }
            Arc::new(PageTextCache::new())
        };

        Self {
            version: self.version + 1,
            document_id: Some(id),
            corpus: Arc::new(corpus),
            pages,
            mappings: Arc::from(Vec::new()),
        }
    }

    /// Fetch and load a document's sentences from a collaborator.
    ///
    /// A failed or unsuccessful fetch degrades to an empty corpus.
    pub fn load_from(&self, source: &dyn SentenceSource, id: DocumentId) -> Self {
        let corpus = match source.get_sentences(&id) {
            Ok(response) if response.success => SentenceCorpus::from_texts(response.sentences),
            Ok(_) => {
                log::warn!("Sentence service has no sentences for document {}", id);
                SentenceCorpus::default()
            },
            Err(e) => {
                log::warn!("Failed to fetch sentences for document {}: {}", id, e);
                SentenceCorpus::default()
            },
        };
        self.load_document(id, corpus)
    }

    /// Cache (or replace) one page's fragments captured at `scale`.
    pub fn with_page(&self, page: PageNumber, fragments: Vec<TextFragment>, scale: f32) -> Self {
        let mut pages = (*self.pages).clone();
        pages.ingest_page_at_scale(page, fragments, scale);
        self.with_cache(pages)
    }

    /// Normalize and cache one page of renderer fragments.
    pub fn with_raw_page(&self, page: PageNumber, raw: &[RawFragment], space: &CoordinateSpace) -> Self {
        let mut pages = (*self.pages).clone();
        pages.ingest_raw(page, raw, space);
        self.with_cache(pages)
    }

    /// Cache several pages in one transition.
    pub fn with_pages<I>(&self, pages: I, scale: f32) -> Self
    where
        I: IntoIterator<Item = (PageNumber, Vec<TextFragment>)>,
    {
        let mut cache = (*self.pages).clone();
        for (page, fragments) in pages {
            cache.ingest_page_at_scale(page, fragments, scale);
        }
        self.with_cache(cache)
    }

    /// Fetch, normalize and cache pages from a collaborator.
    ///
    /// Pages the collaborator cannot supply are skipped.
    pub fn ingest_from(
        &self,
        source: &dyn FragmentSource,
        pages: &[PageNumber],
        space: &CoordinateSpace,
    ) -> Self {
        let mut cache = (*self.pages).clone();
        for &page in pages {
            match source.get_page_fragments(page) {
                Ok(raw) => cache.ingest_raw(page, &raw, space),
                Err(e) => log::warn!("Skipping page {}: {}", page, e),
            }
        }
        self.with_cache(cache)
    }

    fn with_cache(&self, pages: PageTextCache) -> Self {
        Self {
            version: self.version + 1,
            document_id: self.document_id.clone(),
            corpus: Arc::clone(&self.corpus),
            pages: Arc::new(pages),
            mappings: Arc::from(Vec::new()),
        }
    }

    /// Recompute the page mapping of every sentence.
    pub fn relocate(&self, locator: &SentenceLocator) -> Self {
        let mappings = locator.locate_all(self.corpus.as_slice(), &self.pages);
        log::debug!(
            "Document state {} relocated {} sentences",
            self.version + 1,
            mappings.len()
        );

        Self {
            version: self.version + 1,
            document_id: self.document_id.clone(),
            corpus: Arc::clone(&self.corpus),
            pages: Arc::clone(&self.pages),
            mappings: Arc::from(mappings),
        }
    }

    /// Monotonic version of this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Loaded document, if any.
    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    /// Sentence corpus.
    pub fn corpus(&self) -> &SentenceCorpus {
        &self.corpus
    }

    /// Page text cache.
    pub fn pages(&self) -> &PageTextCache {
        &self.pages
    }

    /// Page mappings indexed by sentence id (empty until relocated).
    pub fn mappings(&self) -> &[PageMapping] {
        &self.mappings
    }

    /// Mapping of a sentence.
    pub fn mapping_for(&self, sentence_id: SentenceId) -> Option<&PageMapping> {
        self.mappings
            .get(sentence_id)
            .filter(|m| m.sentence_id == sentence_id)
            .or_else(|| self.mappings.iter().find(|m| m.sentence_id == sentence_id))
    }

    /// Page a sentence was assigned to.
    pub fn page_for(&self, sentence_id: SentenceId) -> Option<PageNumber> {
        self.mapping_for(sentence_id).map(|m| m.page)
    }

    /// Sentences assigned to a page, in corpus order.
    pub fn sentences_on_page(&self, page: PageNumber) -> Vec<SentenceId> {
        self.mappings
            .iter()
            .filter(|m| m.page == page)
            .map(|m| m.sentence_id)
            .collect()
    }

    /// Sentences that only have an order-fallback mapping.
    pub fn unmatched_sentences(&self) -> Vec<SentenceId> {
        self.mappings
            .iter()
            .filter(|m| m.match_type == MatchType::OrderFallback)
            .map(|m| m.sentence_id)
            .collect()
    }

    /// Mapping statistics.
    pub fn statistics(&self) -> MappingStatistics {
        MappingStatistics::from_mappings(&self.mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RawBox, Rect};
    use crate::source::InMemorySource;

    fn fragment(text: &str, page: PageNumber, order: usize) -> TextFragment {
        TextFragment::new(text, page, Rect::new(0.0, order as f32 * 14.0, 300.0, 12.0), order)
    }

    fn loaded() -> DocumentState {
        DocumentState::empty().load_document(
            DocumentId::new("doc"),
            SentenceCorpus::from_texts([
                "The committee approved the annual budget.",
                "Funding for rural clinics doubled this year.",
            ]),
        )
    }

    #[test]
    fn test_transitions_bump_version_and_keep_old_snapshot() {
        let s1 = loaded();
        let s2 = s1.with_page(1, vec![fragment("The committee approved the annual budget.", 1, 0)], 1.0);
        let s3 = s2.relocate(&SentenceLocator::default());

        assert!(s1.version() < s2.version() && s2.version() < s3.version());
        assert!(s1.pages().is_empty());
        assert_eq!(s2.pages().len(), 1);
        assert!(s2.mappings().is_empty());
        assert_eq!(s3.mappings().len(), 2);
    }

    #[test]
    fn test_pages_are_shared_between_states() {
        let s1 = loaded().with_page(1, vec![fragment("alpha", 1, 0)], 1.0);
        let s2 = s1.with_page(2, vec![fragment("beta", 2, 0)], 1.0);

        let a = s1.pages().get_page_shared(1).unwrap();
        let b = s2.pages().get_page_shared(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_new_document_drops_cache() {
        let s1 = loaded().with_page(1, vec![fragment("alpha", 1, 0)], 1.0);
        let same = s1.load_document(DocumentId::new("doc"), SentenceCorpus::from_texts(["x"]));
        let other = s1.load_document(DocumentId::new("other"), SentenceCorpus::from_texts(["x"]));

        assert_eq!(same.pages().len(), 1);
        assert!(other.pages().is_empty());
        assert_eq!(other.document_id(), Some(&DocumentId::new("other")));
    }

    #[test]
    fn test_queries() {
        let state = loaded()
            .with_pages(
                vec![
                    (1, vec![fragment("The committee approved the annual budget.", 1, 0)]),
                    (2, vec![fragment("Funding for rural clinics doubled this year.", 2, 0)]),
                ],
                1.0,
            )
            .relocate(&SentenceLocator::default());

        assert_eq!(state.page_for(0), Some(1));
        assert_eq!(state.page_for(1), Some(2));
        assert_eq!(state.page_for(7), None);
        assert_eq!(state.sentences_on_page(2), vec![1]);
        assert!(state.unmatched_sentences().is_empty());
        assert_eq!(state.statistics().mapped_sentences, 2);
    }

    #[test]
    fn test_load_from_failed_source_degrades() {
        let state = DocumentState::empty().load_from(&InMemorySource::new(), DocumentId::new("nope"));
        assert!(state.corpus().is_empty());
        assert_eq!(state.version(), 1);

        let relocated = state.relocate(&SentenceLocator::default());
        assert!(relocated.mappings().is_empty());
    }

    #[test]
    fn test_ingest_from_skips_missing_pages() {
        let source = InMemorySource::new().with_page(
            1,
            vec![RawFragment {
                text: "Hello".to_string(),
                page: 1,
                bbox: RawBox::Corners {
                    x0: 0.0,
                    y0: 0.0,
                    x1: 50.0,
                    y1: 12.0,
                },
                reading_order: None,
            }],
        );
        let state = loaded().ingest_from(&source, &[1, 2], &CoordinateSpace::screen());
        assert_eq!(state.pages().page_numbers(), vec![1]);
    }
}
