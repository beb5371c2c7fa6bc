//! Word-by-word similarity against overlapping chunks of the page text.

use super::{PageMatchStrategy, PageScore, SentenceProbe};
use crate::cache::CachedPage;
use crate::model::MatchType;
use crate::pipeline::config::LocatorConfig;
use crate::text::{tokenize, word_similarity};

/// Scores overlapping character chunks of the page text by the average best
/// similarity of each significant sentence word to a chunk word.
///
/// Survives OCR noise and re-hyphenation that defeat the exact and overlap
/// strategies.
#[derive(Debug, Clone)]
pub struct FuzzyStrategy {
    chunk_size: usize,
    step: usize,
    min_confidence: f32,
}

impl FuzzyStrategy {
    /// Create the strategy from locator settings.
    pub fn new(config: &LocatorConfig) -> Self {
        let chunk_size = config.fuzzy_chunk_size.max(1);
        let step = ((chunk_size as f32) * (1.0 - config.fuzzy_chunk_overlap)).round() as usize;
        Self {
            chunk_size,
            step: step.clamp(1, chunk_size),
            min_confidence: config.fuzzy_min_confidence,
        }
    }

    /// Byte ranges of the chunks covering `text`.
    fn chunks(&self, text: &str) -> Vec<(usize, usize)> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;
        if char_len == 0 {
            return Vec::new();
        }

        let mut ranges = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_len);
            ranges.push((boundaries[start], boundaries[end]));
            if end == char_len {
                break;
            }
            start += self.step;
        }
        ranges
    }
}

impl PageMatchStrategy for FuzzyStrategy {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn match_type(&self) -> MatchType {
        MatchType::Fuzzy
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    fn score_page(&self, probe: &SentenceProbe<'_>, page: &CachedPage) -> Option<PageScore> {
        let significant = &probe.words.significant;
        if significant.is_empty() {
            return None;
        }

        let mut best: Option<PageScore> = None;
        for (from, to) in self.chunks(&page.full_text) {
            let chunk_words = tokenize(&page.full_text[from..to]);
            if chunk_words.is_empty() {
                continue;
            }

            let total: f32 = significant
                .iter()
                .map(|word| {
                    chunk_words
                        .iter()
                        .map(|candidate| word_similarity(word, candidate))
                        .fold(0.0f32, f32::max)
                })
                .sum();
            let score = total / significant.len() as f32;

            if best.as_ref().map_or(true, |b| score > b.confidence) {
                best = Some(PageScore {
                    confidence: score,
                    anchor: from,
                });
            }
        }

        if let Some(ref hit) = best {
            log::trace!(
                "Fuzzy best chunk on page {}: {:.3} at {}",
                page.page,
                hit.confidence,
                hit.anchor
            );
        }
        best.filter(|hit| hit.confidence > 0.0)
    }
}
