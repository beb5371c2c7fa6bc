//! Sentence-to-page mappings produced by the locator.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PageNumber, SentenceId};

/// Which strategy produced a page mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// A verbatim substring of the sentence was found on the page
    Exact,
    /// A window of page words shares most significant words with the sentence
    WordOverlap,
    /// A page chunk is similar to the sentence word by word
    Fuzzy,
    /// No trustworthy match; the page comes from the reading-order cursor
    OrderFallback,
}

impl MatchType {
    /// All variants, in strategy priority order.
    pub const ALL: [MatchType; 4] = [
        MatchType::Exact,
        MatchType::WordOverlap,
        MatchType::Fuzzy,
        MatchType::OrderFallback,
    ];

    /// Wire name of the match type.
    pub fn name(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::WordOverlap => "word_overlap",
            MatchType::Fuzzy => "fuzzy",
            MatchType::OrderFallback => "order_fallback",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a sentence lives in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMapping {
    /// Sentence id
    pub sentence_id: SentenceId,
    /// Page the sentence was assigned to
    pub page: PageNumber,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Strategy that produced the mapping
    pub match_type: MatchType,
    /// Approximate character offset of the match in the page's search text
    pub anchor_position: usize,
}

impl PageMapping {
    /// A no-match mapping pinned to the reading-order cursor.
    pub fn fallback(sentence_id: SentenceId, page: PageNumber) -> Self {
        Self {
            sentence_id,
            page,
            confidence: 0.0,
            match_type: MatchType::OrderFallback,
            anchor_position: 0,
        }
    }

    /// Whether the sentence was located by any strategy with non-zero confidence.
    pub fn is_mapped(&self) -> bool {
        self.confidence > 0.0
    }
}
