//! Text normalization and word-level comparison.
//!
//! Segmented sentences and rendered fragments never agree character for
//! character: case, ligatures, soft hyphens, line-end hyphenation and
//! whitespace all differ. Both sides go through the same normalization
//! before any comparison.

pub mod hyphenation;
pub mod normalize;
pub mod words;

pub use hyphenation::HyphenationJoiner;
pub use normalize::{normalize_for_search, tokenize};
pub use words::{is_stop_word, word_similarity, words_match, SentenceWords};
