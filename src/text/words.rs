//! Word-level comparison: stop words, significant words and similarity.

use strsim::normalized_levenshtein;

use super::hyphenation::HyphenationJoiner;
use super::normalize::{normalize_for_search, tokenize};

/// Function words ignored when scoring overlap.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "been", "before", "being", "below", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "may", "me", "more", "most", "must", "my", "no",
    "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Minimum length of the shorter word for containment to count as a match.
const MIN_CONTAINMENT_LEN: usize = 3;

/// Whether a lower-cased word is a stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Whether two normalized words refer to the same word.
///
/// Equal words match. Otherwise one must contain the other and the shorter
/// one must have at least three characters, which tolerates hyphenation
/// halves ("govern" / "government") and attached punctuation.
pub fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.chars().count() >= MIN_CONTAINMENT_LEN && long.contains(short)
}

/// Similarity of two normalized words in `[0, 1]`.
///
/// When one word contains the other the score is the length ratio; otherwise
/// it is the normalized Levenshtein similarity.
pub fn word_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if long.contains(short) {
        return short.chars().count() as f32 / long.chars().count() as f32;
    }
    normalized_levenshtein(a, b) as f32
}

/// The word views of one sentence used by the matching stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentenceWords {
    /// Search-normalized sentence text
    pub normalized: String,
    /// Every token in order (duplicates kept)
    pub all: Vec<String>,
    /// Distinct significant tokens in first-seen order: length > 2, not a stop word
    pub significant: Vec<String>,
}

impl SentenceWords {
    /// Analyze a sentence. `cap` limits the number of significant words kept.
    ///
    /// Spaced line-end breaks ("govern- ment") are closed up the same way
    /// the page cache closes them. Sentences made only of short or stop
    /// words fall back to their distinct tokens so they remain matchable.
    pub fn from_text(text: &str, cap: Option<usize>) -> Self {
        let normalized = HyphenationJoiner::default().close_up(&normalize_for_search(text));
        let all = tokenize(&normalized);

        let mut significant: Vec<String> = Vec::new();
        for token in &all {
            if token.chars().count() > 2 && !is_stop_word(token) && !significant.contains(token) {
                significant.push(token.clone());
            }
        }
        if significant.is_empty() {
            for token in &all {
                if !significant.contains(token) {
                    significant.push(token.clone());
                }
            }
        }
        if let Some(cap) = cap {
            significant.truncate(cap);
        }

        Self {
            normalized,
            all,
            significant,
        }
    }

    /// Whether the sentence has no words at all.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Significant words that match any of the given tokens.
    pub fn significant_in<'a>(&'a self, tokens: &[String]) -> Vec<&'a str> {
        self.significant
            .iter()
            .filter(|word| tokens.iter().any(|t| words_match(word, t)))
            .map(String::as_str)
            .collect()
    }
}
