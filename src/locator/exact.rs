//! Exact substring matching against the page search text.

use super::{PageMatchStrategy, PageScore, SentenceProbe};
use crate::cache::CachedPage;
use crate::model::MatchType;
use crate::pipeline::config::LocatorConfig;

/// Finds verbatim (normalized) sentence substrings on a page.
///
/// Probes of decreasing length are cut from the start, middle and end of the
/// sentence. A probe of length `L` scores `L / min(sentence length, longest
/// probe)`, so finding the longest probe scores 1.0.
#[derive(Debug, Clone)]
pub struct ExactStrategy {
    probe_lengths: Vec<usize>,
    accept_confidence: f32,
    min_confidence: f32,
}

impl ExactStrategy {
    /// Create the strategy from locator settings.
    pub fn new(config: &LocatorConfig) -> Self {
        let mut probe_lengths = config.exact_probe_lengths.clone();
        probe_lengths.sort_unstable_by(|a, b| b.cmp(a));
        probe_lengths.dedup();
        Self {
            probe_lengths,
            accept_confidence: config.exact_accept_confidence,
            min_confidence: config.exact_min_confidence,
        }
    }

    /// Probes as `(byte offset in the sentence, probe text)`, longest first.
    fn probes<'a>(&self, normalized: &'a str) -> Vec<(usize, &'a str, usize)> {
        let boundaries: Vec<usize> = normalized
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(normalized.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        let mut lengths: Vec<usize> = self
            .probe_lengths
            .iter()
            .map(|&p| p.min(char_len))
            .filter(|&l| l > 0)
            .collect();
        lengths.dedup();

        let mut probes = Vec::new();
        for len in lengths {
            let mut starts = vec![0, (char_len - len) / 2, char_len - len];
            starts.dedup();
            for start in starts {
                let from = boundaries[start];
                let to = boundaries[start + len];
                probes.push((from, &normalized[from..to], len));
            }
        }
        probes
    }
}

impl PageMatchStrategy for ExactStrategy {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn match_type(&self) -> MatchType {
        MatchType::Exact
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    fn accepts_immediately(&self, confidence: f32) -> bool {
        confidence > self.accept_confidence
    }

    fn uses_lookahead(&self) -> bool {
        false
    }

    fn score_page(&self, probe: &SentenceProbe<'_>, page: &CachedPage) -> Option<PageScore> {
        let normalized = probe.words.normalized.as_str();
        if normalized.is_empty() || page.full_text.is_empty() {
            return None;
        }

        let longest = self.probe_lengths.first().copied().unwrap_or(1);
        let denominator = probe.char_len.min(longest).max(1) as f32;

        for (offset, text, len) in self.probes(normalized) {
            if let Some(found) = page.full_text.find(text) {
                return Some(PageScore {
                    confidence: (len as f32 / denominator).min(1.0),
                    anchor: found.saturating_sub(offset),
                });
            }
        }
        None
    }
}
