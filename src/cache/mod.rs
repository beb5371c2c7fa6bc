//! Page Text Cache.
//!
//! Holds, per page, the positioned fragments and a normalized full-page
//! search string. The full text is only a fast search surface: positions in
//! it are mapped back to fragments through the per-fragment spans recorded
//! while concatenating, never by slicing.
//!
//! Pages are stored behind `Arc` so cloning the cache (one clone per
//! document-state transition) shares every unchanged page.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::geometry::CoordinateSpace;
use crate::model::{normalize_fragments, PageNumber, RawFragment, TextFragment};
use crate::text::{normalize_for_search, tokenize, HyphenationJoiner};

/// A word of the page search surface with its byte offset in the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWord {
    /// Normalized token
    pub text: String,
    /// Byte offset of the whitespace-delimited run the token came from
    pub offset: usize,
}

/// Cached text of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    /// Page number
    pub page: PageNumber,
    /// Scale the fragment geometry was captured at
    pub scale: f32,
    /// Fragments sorted by reading order
    pub fragments: Vec<TextFragment>,
    /// Normalized, space-joined text of all fragments
    pub full_text: String,
    /// `(start, end)` byte span of each fragment inside `full_text`
    pub spans: Vec<(usize, usize)>,
    /// Tokens of `full_text` in order
    pub words: Vec<PageWord>,
}

impl CachedPage {
    /// Build the cache entry for a page.
    fn build(
        page: PageNumber,
        scale: f32,
        mut fragments: Vec<TextFragment>,
        joiner: &HyphenationJoiner,
    ) -> Self {
        fragments.sort_by_key(|f| f.reading_order);
        for (index, fragment) in fragments.iter_mut().enumerate() {
            fragment.reading_order = index;
        }

        let mut full_text = String::new();
        let mut spans = Vec::with_capacity(fragments.len());
        let mut join_next = false;

        for (idx, fragment) in fragments.iter().enumerate() {
            let normalized = joiner.close_up(&normalize_for_search(&fragment.text));

            if join_next {
                if full_text.ends_with('-') {
                    full_text.pop();
                }
            } else if !full_text.is_empty() && !normalized.is_empty() {
                full_text.push(' ');
            }

            let start = full_text.len();
            full_text.push_str(&normalized);
            spans.push((start, full_text.len()));

            join_next = match fragments.get(idx + 1) {
                Some(next) if !normalized.is_empty() => {
                    let starts_line = (next.center().y - fragment.center().y).abs()
                        > fragment.bbox.height.max(1.0) * 0.5;
                    joiner.joins(&fragment.text, &next.text, starts_line)
                },
                _ => false,
            };
        }

        let words = Self::index_words(&full_text);

        Self {
            page,
            scale,
            fragments,
            full_text,
            spans,
            words,
        }
    }

    fn index_words(full_text: &str) -> Vec<PageWord> {
        let mut words = Vec::new();
        let mut offset = 0;
        for run in full_text.split(' ') {
            for token in tokenize(run) {
                words.push(PageWord {
                    text: token,
                    offset,
                });
            }
            offset += run.len() + 1;
        }
        words
    }

    /// Whether the page has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Index of the fragment whose span contains (or follows) a byte offset.
    pub fn fragment_index_at(&self, offset: usize) -> Option<usize> {
        if self.spans.is_empty() {
            return None;
        }
        let idx = self.spans.partition_point(|&(_, end)| end <= offset);
        Some(idx.min(self.spans.len() - 1))
    }

    /// The fragment at a byte offset of the full text.
    pub fn fragment_at_offset(&self, offset: usize) -> Option<&TextFragment> {
        self.fragment_index_at(offset)
            .and_then(|idx| self.fragments.get(idx))
    }
}

/// Per-document cache of page text, keyed by page number.
#[derive(Debug, Clone, Default)]
pub struct PageTextCache {
    pages: BTreeMap<PageNumber, Arc<CachedPage>>,
    joiner: HyphenationJoiner,
}

impl PageTextCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the fragments of a page captured at scale 1.0.
    ///
    /// Fragments are sorted by their reading order and renumbered `0..n`;
    /// the renumbered index is the one used in every [`FragmentId`].
    /// An empty fragment list is valid and produces an empty entry.
    ///
    /// [`FragmentId`]: crate::model::FragmentId
    pub fn ingest_page(&mut self, page: PageNumber, fragments: Vec<TextFragment>) {
        self.ingest_page_at_scale(page, fragments, 1.0);
    }

    /// Store the fragments of a page captured at the given scale.
    ///
    /// Re-ingesting a page replaces its previous entry.
    pub fn ingest_page_at_scale(&mut self, page: PageNumber, fragments: Vec<TextFragment>, scale: f32) {
        let entry = CachedPage::build(page, scale, fragments, &self.joiner);
        log::debug!(
            "Cached page {} ({} fragments, {} chars, scale {})",
            page,
            entry.fragments.len(),
            entry.full_text.len(),
            scale
        );
        self.pages.insert(page, Arc::new(entry));
    }

    /// Normalize renderer fragments into screen space and store them.
    pub fn ingest_raw(&mut self, page: PageNumber, raw: &[RawFragment], space: &CoordinateSpace) {
        let fragments = normalize_fragments(page, raw, space);
        self.ingest_page_at_scale(page, fragments, space.scale);
    }

    /// Cached entry of a page.
    pub fn get_page(&self, page: PageNumber) -> Option<&CachedPage> {
        self.pages.get(&page).map(Arc::as_ref)
    }

    /// Shared handle to a cached page.
    pub fn get_page_shared(&self, page: PageNumber) -> Option<Arc<CachedPage>> {
        self.pages.get(&page).cloned()
    }

    /// Drop every cached page.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Cached pages in ascending page order.
    pub fn pages(&self) -> impl DoubleEndedIterator<Item = &CachedPage> {
        self.pages.values().map(Arc::as_ref)
    }

    /// Cached page numbers in ascending order.
    pub fn page_numbers(&self) -> Vec<PageNumber> {
        self.pages.keys().copied().collect()
    }

    /// Lowest cached page number.
    pub fn first_page(&self) -> Option<PageNumber> {
        self.pages.keys().next().copied()
    }

    /// Smallest cached page number strictly after `page`.
    pub fn next_page_after(&self, page: PageNumber) -> Option<PageNumber> {
        self.pages
            .range((std::ops::Bound::Excluded(page), std::ops::Bound::Unbounded))
            .next()
            .map(|(p, _)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RawBox, Rect};

    fn frag(text: &str, x: f32, y: f32, order: usize) -> TextFragment {
        TextFragment::new(text, 1, Rect::new(x, y, 120.0, 12.0), order)
    }

    #[test]
    fn test_full_text_is_space_joined_lowercase() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(
            1,
            vec![frag("The Model", 0.0, 0.0, 0), frag("ACHIEVES 92%", 130.0, 0.0, 1)],
        );
        let page = cache.get_page(1).unwrap();
        assert_eq!(page.full_text, "the model achieves 92%");
        assert_eq!(page.spans, vec![(0, 9), (10, 22)]);
    }

    #[test]
    fn test_full_text_follows_reading_order() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(1, vec![frag("second", 0.0, 20.0, 5), frag("first", 0.0, 0.0, 2)]);
        let page = cache.get_page(1).unwrap();
        assert_eq!(page.full_text, "first second");
        assert_eq!(page.fragments[0].reading_order, 0);
        assert_eq!(page.fragments[1].text, "second");
    }

    #[test]
    fn test_line_end_hyphen_is_joined() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(
            1,
            vec![frag("the Govern-", 0.0, 0.0, 0), frag("ment said", 0.0, 14.0, 1)],
        );
        assert_eq!(cache.get_page(1).unwrap().full_text, "the government said");
    }

    #[test]
    fn test_mid_line_hyphen_is_kept() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(
            1,
            vec![frag("a well-", 0.0, 0.0, 0), frag("known result", 125.0, 0.0, 1)],
        );
        assert_eq!(cache.get_page(1).unwrap().full_text, "a well- known result");
    }

    #[test]
    fn test_fragment_at_offset() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(1, vec![frag("alpha", 0.0, 0.0, 0), frag("beta", 130.0, 0.0, 1)]);
        let page = cache.get_page(1).unwrap();
        assert_eq!(page.fragment_at_offset(0).unwrap().text, "alpha");
        assert_eq!(page.fragment_at_offset(7).unwrap().text, "beta");
        // The separator space resolves to the following fragment
        assert_eq!(page.fragment_at_offset(5).unwrap().text, "beta");
        assert_eq!(page.fragment_at_offset(500).unwrap().text, "beta");
    }

    #[test]
    fn test_words_carry_offsets() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(1, vec![frag("Hello, world!", 0.0, 0.0, 0)]);
        let page = cache.get_page(1).unwrap();
        assert_eq!(page.words.len(), 2);
        assert_eq!(page.words[1].text, "world");
        assert_eq!(page.words[1].offset, 7);
    }

    #[test]
    fn test_empty_page_is_valid() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(4, Vec::new());
        let page = cache.get_page(4).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.full_text, "");
        assert!(page.fragment_at_offset(0).is_none());
    }

    #[test]
    fn test_ingest_raw_records_scale() {
        let mut cache = PageTextCache::new();
        let raw = vec![RawFragment {
            text: "zoomed".to_string(),
            page: 2,
            bbox: RawBox::Xywh {
                x: 10.0,
                y: 10.0,
                width: 50.0,
                height: 10.0,
            },
            reading_order: None,
        }];
        cache.ingest_raw(2, &raw, &CoordinateSpace::screen().with_scale(2.0));
        let page = cache.get_page(2).unwrap();
        assert_eq!(page.scale, 2.0);
        assert_eq!(page.fragments[0].bbox, Rect::new(20.0, 20.0, 100.0, 20.0));
    }

    #[test]
    fn test_page_navigation_helpers() {
        let mut cache = PageTextCache::new();
        cache.ingest_page(3, Vec::new());
        cache.ingest_page(1, Vec::new());
        cache.ingest_page(7, Vec::new());
        assert_eq!(cache.page_numbers(), vec![1, 3, 7]);
        assert_eq!(cache.first_page(), Some(1));
        assert_eq!(cache.next_page_after(3), Some(7));
        assert_eq!(cache.next_page_after(7), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
