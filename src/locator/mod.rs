//! Sentence-to-page locator.
//!
//! Assigns every sentence of a corpus to a page of the [`PageTextCache`]
//! using a layered strategy: exact substring probes, then significant-word
//! overlap, then fuzzy word similarity. Each strategy stops the search when
//! its best hit clears the strategy's threshold.
//!
//! Sentences arrive in reading order, so the locator keeps an "expected page"
//! cursor that only moves forward:
//!
//! - a mapping never resolves to a page before the cursor; hits on earlier
//!   pages are clamped to the cursor as [`MatchType::OrderFallback`]
//! - weak hits may not move the cursor; they fall back to it as well
//! - a density cap moves the cursor to the next cached page once it has
//!   received ~1.5x the average number of sentences per page
//!
//! As a result `page(i) <= page(j)` holds for all `i < j`.
//!
//! # Example
//!
//! ```
//! use evidence_lens::cache::PageTextCache;
//! use evidence_lens::geometry::Rect;
//! use evidence_lens::locator::SentenceLocator;
//! use evidence_lens::model::{MatchType, SentenceCorpus, TextFragment};
//!
//! let mut cache = PageTextCache::new();
//! cache.ingest_page(1, vec![TextFragment::new("Abstract.", 1, Rect::new(0.0, 0.0, 60.0, 12.0), 0)]);
//! cache.ingest_page(2, vec![TextFragment::new(
//!     "The model achieves 92% accuracy.",
//!     2,
//!     Rect::new(0.0, 0.0, 200.0, 12.0),
//!     0,
//! )]);
//!
//! let corpus = SentenceCorpus::from_texts(["The model achieves 92% accuracy."]);
//! let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);
//! assert_eq!(mappings[0].page, 2);
//! assert_eq!(mappings[0].match_type, MatchType::Exact);
//! ```

mod exact;
mod fuzzy;
mod header;
mod overlap;

pub use exact::ExactStrategy;
pub use fuzzy::FuzzyStrategy;
pub use header::is_header_like;
pub use overlap::{WordOverlapStrategy, MAX_OVERLAP_WORDS};

use crate::cache::{CachedPage, PageTextCache};
use crate::model::{MatchType, PageMapping, PageNumber, Sentence, SentenceId};
use crate::pipeline::config::LocatorConfig;
use crate::text::SentenceWords;

/// A sentence prepared for page matching.
#[derive(Debug, Clone)]
pub struct SentenceProbe<'a> {
    /// Sentence id
    pub id: SentenceId,
    /// Original sentence text
    pub text: &'a str,
    /// Normalized text and word views
    pub words: SentenceWords,
    /// Length of the normalized text in characters
    pub char_len: usize,
}

impl<'a> SentenceProbe<'a> {
    /// Prepare a sentence, keeping at most `max_significant` significant words.
    pub fn new(id: SentenceId, text: &'a str, max_significant: usize) -> Self {
        let words = SentenceWords::from_text(text, Some(max_significant));
        let char_len = words.normalized.chars().count();
        Self {
            id,
            text,
            words,
            char_len,
        }
    }

    /// Whether there is nothing to match.
    pub fn is_empty(&self) -> bool {
        self.words.normalized.is_empty()
    }
}

/// Best score of a strategy on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageScore {
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Byte offset of the match in the page's search text
    pub anchor: usize,
}

/// One layer of the page matching cascade.
///
/// Implementations score a single page; the locator decides which pages are
/// visited and in which order.
pub trait PageMatchStrategy: Send + Sync {
    /// Return the name of this strategy for debugging.
    fn name(&self) -> &'static str;

    /// Match type recorded for mappings produced by this strategy.
    fn match_type(&self) -> MatchType;

    /// Hits below this confidence do not count.
    fn min_confidence(&self) -> f32;

    /// Whether a hit is good enough to stop scanning further pages.
    fn accepts_immediately(&self, _confidence: f32) -> bool {
        false
    }

    /// Whether the page scan is limited to the lookahead window.
    fn uses_lookahead(&self) -> bool {
        true
    }

    /// Score the best match of the sentence on a page.
    fn score_page(&self, probe: &SentenceProbe<'_>, page: &CachedPage) -> Option<PageScore>;
}

/// Raw result of the strategy cascade, before continuity rules apply.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    page: PageNumber,
    score: PageScore,
    match_type: MatchType,
}

/// Batch sentence-to-page locator.
pub struct SentenceLocator {
    config: LocatorConfig,
    strategies: Vec<Box<dyn PageMatchStrategy>>,
}

impl Default for SentenceLocator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}

impl std::fmt::Debug for SentenceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceLocator")
            .field("config", &self.config)
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SentenceLocator {
    /// Create a locator with the exact, word-overlap and fuzzy strategies.
    ///
    /// `max_significant_words` is clamped to [`MAX_OVERLAP_WORDS`].
    pub fn new(mut config: LocatorConfig) -> Self {
        if config.max_significant_words > MAX_OVERLAP_WORDS {
            log::warn!(
                "max_significant_words {} exceeds {}; clamping",
                config.max_significant_words,
                MAX_OVERLAP_WORDS
            );
            config.max_significant_words = MAX_OVERLAP_WORDS;
        }
        let strategies: Vec<Box<dyn PageMatchStrategy>> = vec![
            Box::new(ExactStrategy::new(&config)),
            Box::new(WordOverlapStrategy::new(&config)),
            Box::new(FuzzyStrategy::new(&config)),
        ];
        Self { config, strategies }
    }

    /// Replace the strategy cascade.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn PageMatchStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Locator settings.
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Map every sentence to a page, in sentence order.
    ///
    /// Returns exactly one mapping per sentence. Sentences that no strategy
    /// can place are pinned to the cursor with confidence 0. With no cached
    /// pages every sentence maps to page 0.
    pub fn locate_all(&self, sentences: &[Sentence], pages: &PageTextCache) -> Vec<PageMapping> {
        let Some(first_page) = pages.first_page() else {
            log::debug!("No cached pages; {} sentences fall back to page 0", sentences.len());
            return sentences
                .iter()
                .map(|s| PageMapping::fallback(s.id, 0))
                .collect();
        };

        let density_cap = self.density_cap(sentences.len(), pages.len());
        let mut cursor = first_page;
        let mut on_cursor = 0usize;
        let mut mappings = Vec::with_capacity(sentences.len());

        for sentence in sentences {
            if on_cursor >= density_cap {
                if let Some(next) = pages.next_page_after(cursor) {
                    log::trace!("Density cap reached on page {}; advancing to {}", cursor, next);
                    cursor = next;
                    on_cursor = 0;
                }
            }

            let mapping = self.locate_one(sentence, pages, cursor);
            if mapping.page != cursor {
                cursor = mapping.page;
                on_cursor = 0;
            }
            on_cursor += 1;
            mappings.push(mapping);
        }

        log::info!(
            "Located {} sentences across {} pages",
            mappings.len(),
            pages.len()
        );
        mappings
    }

    /// Locate a single sentence given the current cursor.
    fn locate_one(&self, sentence: &Sentence, pages: &PageTextCache, cursor: PageNumber) -> PageMapping {
        let probe = SentenceProbe::new(sentence.id, &sentence.text, self.config.max_significant_words);
        if probe.is_empty() {
            log::debug!("Sentence {} is empty; pinned to page {}", sentence.id, cursor);
            return PageMapping::fallback(sentence.id, cursor);
        }

        let Some(mut candidate) = self.best_candidate(&probe, pages, cursor) else {
            log::debug!(
                "Sentence {} not located by any strategy; pinned to page {}",
                sentence.id,
                cursor
            );
            return PageMapping::fallback(sentence.id, cursor);
        };

        if is_header_like(&sentence.text, self.config.short_sentence_length) {
            candidate.score.confidence = candidate
                .score
                .confidence
                .min(self.config.header_confidence_cap);
        }

        if candidate.page < cursor {
            log::debug!(
                "Sentence {} matched earlier page {} ({}); clamped to {}",
                sentence.id,
                candidate.page,
                candidate.match_type,
                cursor
            );
            return self.clamped(sentence.id, cursor, candidate.score.confidence);
        }

        if candidate.page != cursor && candidate.score.confidence < self.config.min_jump_confidence {
            log::debug!(
                "Sentence {} weak match on page {} ({:.2}); kept on {}",
                sentence.id,
                candidate.page,
                candidate.score.confidence,
                cursor
            );
            return self.clamped(sentence.id, cursor, candidate.score.confidence);
        }

        log::debug!(
            "Sentence {} -> page {} ({}, {:.2})",
            sentence.id,
            candidate.page,
            candidate.match_type,
            candidate.score.confidence
        );
        PageMapping {
            sentence_id: sentence.id,
            page: candidate.page,
            confidence: candidate.score.confidence.clamp(0.0, 1.0),
            match_type: candidate.match_type,
            anchor_position: candidate.score.anchor,
        }
    }

    fn clamped(&self, sentence_id: SentenceId, cursor: PageNumber, confidence: f32) -> PageMapping {
        PageMapping {
            confidence: (confidence * self.config.fallback_penalty).clamp(0.0, 1.0),
            ..PageMapping::fallback(sentence_id, cursor)
        }
    }

    /// Run the strategy cascade: forward pages first, then earlier pages.
    fn best_candidate(
        &self,
        probe: &SentenceProbe<'_>,
        pages: &PageTextCache,
        cursor: PageNumber,
    ) -> Option<Candidate> {
        for strategy in &self.strategies {
            let limit = if strategy.uses_lookahead() {
                self.config.max_lookahead_pages
            } else {
                None
            };
            let in_window = |page: PageNumber| match limit {
                Some(n) => page.abs_diff(cursor) <= n,
                None => true,
            };

            let forward = pages.pages().filter(|p| p.page >= cursor && in_window(p.page));
            if let Some(hit) = scan(strategy.as_ref(), probe, forward) {
                return Some(hit);
            }

            let backward = pages
                .pages()
                .rev()
                .filter(|p| p.page < cursor && in_window(p.page));
            if let Some(hit) = scan(strategy.as_ref(), probe, backward) {
                return Some(hit);
            }
        }
        None
    }

    /// Number of sentences a page may receive before the cursor is pushed on.
    fn density_cap(&self, sentences: usize, pages: usize) -> usize {
        if pages == 0 {
            return usize::MAX;
        }
        let average = sentences as f32 / pages as f32;
        ((self.config.density_cap_factor * average).ceil() as usize).max(1)
    }
}

/// Best hit of one strategy over a sequence of pages.
fn scan<'p>(
    strategy: &dyn PageMatchStrategy,
    probe: &SentenceProbe<'_>,
    pages: impl Iterator<Item = &'p CachedPage>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for page in pages {
        let Some(score) = strategy.score_page(probe, page) else {
            continue;
        };
        if score.confidence < strategy.min_confidence() {
            continue;
        }
        let candidate = Candidate {
            page: page.page,
            score,
            match_type: strategy.match_type(),
        };
        if strategy.accepts_immediately(score.confidence) {
            return Some(candidate);
        }
        if best.map_or(true, |b| score.confidence > b.score.confidence) {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{SentenceCorpus, TextFragment};

    fn cache_with(pages: &[(PageNumber, &str)]) -> PageTextCache {
        let mut cache = PageTextCache::new();
        for (page, text) in pages {
            cache.ingest_page(
                *page,
                vec![TextFragment::new(*text, *page, Rect::new(0.0, 0.0, 400.0, 12.0), 0)],
            );
        }
        cache
    }

    #[test]
    fn test_exact_match_and_continuity() {
        let cache = cache_with(&[
            (1, "Title page."),
            (2, "Nothing here."),
            (3, "The model achieves 92% accuracy."),
        ]);
        let corpus = SentenceCorpus::from_texts([
            "The model achieves 92% accuracy.",
            "Prior work used smaller datasets.",
        ]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].page, 3);
        assert_eq!(mappings[0].match_type, MatchType::Exact);
        assert!(mappings[0].confidence > 0.8);
        assert!(mappings[1].page >= 3);
        assert_eq!(mappings[1].match_type, MatchType::OrderFallback);
        assert_eq!(mappings[1].confidence, 0.0);
    }

    #[test]
    fn test_earlier_page_is_clamped() {
        let cache = cache_with(&[
            (1, "Alpha bravo charlie delta echo."),
            (2, "Foxtrot golf hotel india juliet."),
        ]);
        let corpus = SentenceCorpus::from_texts([
            "Foxtrot golf hotel india juliet.",
            "Alpha bravo charlie delta echo.",
        ]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);

        assert_eq!(mappings[0].page, 2);
        assert_eq!(mappings[1].page, 2);
        assert_eq!(mappings[1].match_type, MatchType::OrderFallback);
        assert!((mappings[1].confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_header_sentence_is_down_weighted() {
        let cache = cache_with(&[(1, "Intro text."), (2, "Table 2 lists results.")]);
        let corpus = SentenceCorpus::from_texts(["Table 2"]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);

        // Capped confidence is too weak to move the cursor off page 1
        assert_eq!(mappings[0].page, 1);
        assert_eq!(mappings[0].match_type, MatchType::OrderFallback);
        assert!(mappings[0].confidence <= 0.3);
    }

    #[test]
    fn test_header_on_cursor_page_keeps_match_type() {
        let cache = cache_with(&[(1, "CHAPTER 3 begins here.")]);
        let corpus = SentenceCorpus::from_texts(["CHAPTER 3"]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);

        assert_eq!(mappings[0].page, 1);
        assert_eq!(mappings[0].match_type, MatchType::Exact);
        assert!((mappings[0].confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_density_cap_pushes_cursor() {
        let cache = cache_with(&[(1, "aaa"), (2, "bbb")]);
        let corpus = SentenceCorpus::from_texts(["one", "two", "three", "four"]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);

        // Average is 2 per page, cap is 3
        let pages: Vec<_> = mappings.iter().map(|m| m.page).collect();
        assert_eq!(pages, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_no_pages_falls_back_to_zero() {
        let cache = PageTextCache::new();
        let corpus = SentenceCorpus::from_texts(["anything"]);
        let mappings = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);
        assert_eq!(mappings, vec![PageMapping::fallback(0, 0)]);
    }

    #[test]
    fn test_empty_corpus() {
        let cache = cache_with(&[(1, "text")]);
        assert!(SentenceLocator::default().locate_all(&[], &cache).is_empty());
    }

    #[test]
    fn test_lookahead_limits_overlap_search() {
        let mut pages = vec![(1, "Opening remarks.")];
        let far = "Previous studies relied on smaller curated datasets.";
        pages.push((20, far));
        let cache = cache_with(&pages);
        let corpus = SentenceCorpus::from_texts(["Prior studies used smaller curated datasets."]);

        let limited = SentenceLocator::default().locate_all(corpus.as_slice(), &cache);
        assert_eq!(limited[0].page, 1);

        let config = LocatorConfig {
            max_lookahead_pages: None,
            ..LocatorConfig::default()
        };
        let unlimited = SentenceLocator::new(config).locate_all(corpus.as_slice(), &cache);
        assert_eq!(unlimited[0].page, 20);
        assert_eq!(unlimited[0].match_type, MatchType::WordOverlap);
    }

    #[test]
    fn test_significant_word_cap_is_clamped() {
        let config = LocatorConfig {
            max_significant_words: 100,
            ..LocatorConfig::default()
        };
        let locator = SentenceLocator::new(config);
        assert_eq!(locator.config().max_significant_words, MAX_OVERLAP_WORDS);

        // 70 distinct significant words, reversed on the page
        let terms: Vec<String> = (0..70).map(|i| format!("term{:03}", i)).collect();
        let sentence = format!("{}.", terms.join(" "));
        let reversed: Vec<&str> = terms.iter().rev().map(String::as_str).collect();
        let cache = cache_with(&[(1, reversed.join(" ").as_str())]);
        let corpus = SentenceCorpus::from_texts([sentence]);

        let mappings = locator.locate_all(corpus.as_slice(), &cache);
        assert_eq!(mappings[0].match_type, MatchType::WordOverlap);
        assert_eq!(mappings[0].confidence, 1.0);
    }
}
