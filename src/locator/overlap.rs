//! Significant-word overlap between a sentence and a window of page words.

use super::{PageMatchStrategy, PageScore, SentenceProbe};
use crate::cache::CachedPage;
use crate::model::MatchType;
use crate::pipeline::config::LocatorConfig;
use crate::text::words_match;

/// Most significant words a sentence can contribute; one bit per word.
pub const MAX_OVERLAP_WORDS: usize = u64::BITS as usize;

/// Slides a window over the page's words and scores the fraction of the
/// sentence's significant words found inside it.
///
/// The window spans as many page words as the sentence has words, so stop
/// words on the page do not push significant words out of the window.
#[derive(Debug, Clone)]
pub struct WordOverlapStrategy {
    min_words: usize,
    min_confidence: f32,
}

impl WordOverlapStrategy {
    /// Create the strategy from locator settings.
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            min_words: config.min_overlap_words,
            min_confidence: config.word_overlap_min_confidence,
        }
    }
}

impl PageMatchStrategy for WordOverlapStrategy {
    fn name(&self) -> &'static str {
        "word_overlap"
    }

    fn match_type(&self) -> MatchType {
        MatchType::WordOverlap
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    fn score_page(&self, probe: &SentenceProbe<'_>, page: &CachedPage) -> Option<PageScore> {
        let significant = &probe.words.significant;
        if significant.len() < self.min_words || page.words.is_empty() {
            return None;
        }

        // Which sentence words each page word matches, as a bit mask
        let masks: Vec<u64> = page
            .words
            .iter()
            .map(|word| {
                significant
                    .iter()
                    .enumerate()
                    .take(MAX_OVERLAP_WORDS)
                    .filter(|(_, s)| words_match(s, &word.text))
                    .fold(0u64, |mask, (bit, _)| mask | (1 << bit))
            })
            .collect();

        let window = probe.words.all.len().max(significant.len()).min(masks.len());
        let mut counts = [0u32; MAX_OVERLAP_WORDS];
        let mut present = 0usize;

        for &mask in &masks[..window] {
            slide(mask, &mut counts, &mut present, true);
        }
        let mut best_present = present;
        let mut best_start = 0;

        for start in 1..=(masks.len() - window) {
            slide(masks[start - 1], &mut counts, &mut present, false);
            slide(masks[start + window - 1], &mut counts, &mut present, true);
            if present > best_present {
                best_present = present;
                best_start = start;
            }
        }

        if best_present == 0 {
            return None;
        }

        let confidence = best_present as f32 / significant.len() as f32;
        log::trace!(
            "Word overlap on page {}: {}/{} words at word {}",
            page.page,
            best_present,
            significant.len(),
            best_start
        );

        Some(PageScore {
            confidence,
            anchor: page.words[best_start].offset,
        })
    }
}

/// Add (or remove) one page word's mask to the window counts.
fn slide(mask: u64, counts: &mut [u32; MAX_OVERLAP_WORDS], present: &mut usize, entering: bool) {
    let mut bits = mask;
    while bits != 0 {
        let bit = bits.trailing_zeros() as usize;
        bits &= bits - 1;
        if entering {
            if counts[bit] == 0 {
                *present += 1;
            }
            counts[bit] += 1;
        } else {
            counts[bit] -= 1;
            if counts[bit] == 0 {
                *present -= 1;
            }
        }
    }
}
