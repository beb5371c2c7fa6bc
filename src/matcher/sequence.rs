//! Sequential fragment-sequence matching.
//!
//! Looks for a run of consecutive fragments whose tokens contain a run of
//! sentence words in order. Longer runs are tried first; fragments that
//! contribute no word (punctuation, footnote markers, stray glyphs) are
//! skipped up to a gap budget proportional to the run length.

use super::{FragmentTokens, StepMatch};
use crate::model::TextFragment;
use crate::pipeline::config::MatcherConfig;
use crate::text::{words_match, SentenceWords};

/// Find the longest in-order word run realized by consecutive fragments.
///
/// Confidence is the run length divided by the number of sentence words.
pub fn find_sequence<'a>(
    config: &MatcherConfig,
    words: &SentenceWords,
    fragments: &[FragmentTokens<'a>],
) -> Option<StepMatch<'a>> {
    let total = words.all.len();
    if total < config.min_sequence_length || fragments.is_empty() {
        return None;
    }

    let longest = config.max_sequence_length.min(total);
    for len in (config.min_sequence_length..=longest).rev() {
        let max_gaps = config.sequence_gap_factor * len;
        for start in 0..=(total - len) {
            let run = &words.all[start..start + len];
            for first in 0..fragments.len() {
                if let Some(hit) = match_run_from(run, fragments, first, max_gaps) {
                    log::trace!(
                        "Sequence of {} words from word {} matched at fragment {}",
                        len,
                        start,
                        first
                    );
                    return Some(StepMatch {
                        elements: hit,
                        confidence: len as f32 / total as f32,
                    });
                }
            }
        }
    }
    None
}

/// Try to consume `run` starting at fragment `first`.
///
/// Returns the contributing fragments with the words each one matched.
fn match_run_from<'a>(
    run: &[String],
    fragments: &[FragmentTokens<'a>],
    first: usize,
    max_gaps: usize,
) -> Option<Vec<(&'a TextFragment, Vec<String>)>> {
    let mut next_word = 0;
    let mut gaps = 0;
    let mut elements = Vec::new();

    for (offset, fragment) in fragments[first..].iter().enumerate() {
        let mut matched = Vec::new();
        for token in &fragment.tokens {
            if next_word < run.len() && words_match(&run[next_word], token) {
                matched.push(run[next_word].clone());
                next_word += 1;
            }
        }

        if matched.is_empty() {
            if offset == 0 {
                return None;
            }
            gaps += 1;
            if gaps > max_gaps {
                return None;
            }
        } else {
            elements.push((fragment.fragment, matched));
        }

        if next_word == run.len() {
            return Some(elements);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::matcher::tokenize_fragments;
    use crate::model::TextFragment;

    fn frags(texts: &[&str]) -> Vec<TextFragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextFragment::new(*t, 1, Rect::new(i as f32 * 50.0, 0.0, 45.0, 12.0), i))
            .collect()
    }

    #[test]
    fn test_full_sentence_across_fragments() {
        let fragments = frags(&["Intro", "The model", "achieves", "92% accuracy."]);
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("The model achieves 92% accuracy.", None);
        let hit = find_sequence(&MatcherConfig::default(), &words, &indexed).unwrap();
        assert_eq!(hit.confidence, 1.0);
        assert_eq!(hit.elements.len(), 3);
        assert_eq!(hit.elements[0].1, vec!["the", "model"]);
    }

    #[test]
    fn test_punctuation_fragments_are_gaps() {
        let fragments = frags(&["smaller", "(", "curated", ")", "datasets"]);
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("smaller curated datasets", None);
        let hit = find_sequence(&MatcherConfig::default(), &words, &indexed).unwrap();
        assert_eq!(hit.elements.len(), 3);
        assert_eq!(hit.elements[2].0.text, "datasets");
    }

    #[test]
    fn test_partial_sequence_lowers_confidence() {
        // Six words; only the last three are on the page
        let fragments = frags(&["Header", "gamma delta epsilon"]);
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("Alpha beta ceta gamma delta epsilon", None);
        let hit = find_sequence(&MatcherConfig::default(), &words, &indexed).unwrap();
        assert_eq!(hit.confidence, 0.5);
        assert_eq!(hit.elements.len(), 1);
    }

    #[test]
    fn test_gap_budget_exceeded() {
        let config = MatcherConfig {
            sequence_gap_factor: 0,
            ..MatcherConfig::default()
        };
        let fragments = frags(&["alpha", "x", "bravo", "charlie"]);
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("alpha bravo charlie", None);
        assert!(find_sequence(&config, &words, &indexed).is_none());
        assert!(find_sequence(&MatcherConfig::default(), &words, &indexed).is_some());
    }

    #[test]
    fn test_short_sentence_skips_sequences() {
        let fragments = frags(&["It works."]);
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("It works.", None);
        assert!(find_sequence(&MatcherConfig::default(), &words, &indexed).is_none());
    }
}
