//! Line-end hyphenation joining for the page search surface.
//!
//! Renderers report "Govern-" and "ment" as two fragments on consecutive
//! lines while the segmented sentence says "Government". When the cache
//! concatenates fragments it asks this module whether the boundary between
//! two fragments is a word break that must be closed up.
//!
//! Soft hyphens (U+00AD) always mark a break. Hard hyphens only do at the
//! end of a line, and only when the word is not a compound ("self-", "non-").

/// Decides whether two adjacent fragments are halves of one hyphenated word.
#[derive(Debug, Clone)]
pub struct HyphenationJoiner {
    /// Minimum length of the continuation word (avoids joining list markers)
    min_continuation_length: usize,
    /// Keep hyphens after common compound prefixes
    preserve_compounds: bool,
}

impl Default for HyphenationJoiner {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefixes that normally keep their hyphen across a line break.
const COMPOUND_PREFIXES: &[&str] = &[
    "self", "non", "anti", "pre", "post", "co", "ex", "multi", "semi", "sub", "super", "ultra",
    "cross", "inter", "intra", "counter", "mid", "well", "ill", "all", "half", "high", "low",
    "full", "state", "long", "short", "two", "three",
];

impl HyphenationJoiner {
    /// Create a joiner with default settings.
    pub fn new() -> Self {
        Self {
            min_continuation_length: 2,
            preserve_compounds: true,
        }
    }

    /// Set minimum continuation length for word joining.
    pub fn with_min_continuation_length(mut self, len: usize) -> Self {
        self.min_continuation_length = len;
        self
    }

    /// Set whether to preserve compound words.
    pub fn with_preserve_compounds(mut self, preserve: bool) -> Self {
        self.preserve_compounds = preserve;
        self
    }

    /// Check if a fragment ends with a continuation hyphen.
    ///
    /// True for a trailing soft hyphen or hard hyphen with a letter before it.
    /// "- item" and "1990-" are not continuations.
    ///
    /// # Examples
    ///
    /// ```
    /// use evidence_lens::text::HyphenationJoiner;
    ///
    /// assert!(HyphenationJoiner::is_continuation_hyphen("Govern-"));
    /// assert!(!HyphenationJoiner::is_continuation_hyphen("1990-"));
    /// ```
    pub fn is_continuation_hyphen(text: &str) -> bool {
        let trimmed = text.trim_end();
        let before = if let Some(stripped) = trimmed.strip_suffix('\u{00AD}') {
            stripped
        } else if let Some(stripped) = trimmed.strip_suffix('-') {
            stripped
        } else {
            return false;
        };
        before.chars().last().is_some_and(char::is_alphabetic)
    }

    /// Whether `current` and `next` should be closed up into one word.
    ///
    /// `next_starts_line` tells whether `next` begins a new visual line; a
    /// hard hyphen in the middle of a line is always kept.
    pub fn joins(&self, current: &str, next: &str, next_starts_line: bool) -> bool {
        if !Self::is_continuation_hyphen(current) {
            return false;
        }

        let next_word = next.split_whitespace().next().unwrap_or("");
        if next_word.chars().filter(|c| c.is_alphabetic()).count() < self.min_continuation_length {
            return false;
        }
        if !next_word.chars().next().is_some_and(char::is_lowercase) {
            return false;
        }

        let trimmed = current.trim_end();
        if trimmed.ends_with('\u{00AD}') {
            return true;
        }
        if !next_starts_line {
            return false;
        }

        let last_word = trimmed[..trimmed.len() - 1]
            .split_whitespace()
            .next_back()
            .unwrap_or("");
        !(self.preserve_compounds && Self::is_compound_prefix(last_word))
    }

    /// Close up spaced continuation hyphens inside already-normalized text.
    ///
    /// Segmenters often keep a line-end break as "govern- ment". The page
    /// side closes such breaks while concatenating fragments, so the sentence
    /// side must apply the same rule before the two are compared.
    ///
    /// # Examples
    ///
    /// ```
    /// use evidence_lens::text::HyphenationJoiner;
    ///
    /// let joiner = HyphenationJoiner::new();
    /// assert_eq!(joiner.close_up("the govern- ment said"), "the government said");
    /// assert_eq!(joiner.close_up("a well- known result"), "a well- known result");
    /// ```
    pub fn close_up(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut out = String::with_capacity(text.len());
        let mut join_next = false;

        for (idx, word) in words.iter().enumerate() {
            if join_next {
                if out.ends_with('-') {
                    out.pop();
                }
            } else if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
            join_next = words
                .get(idx + 1)
                .is_some_and(|next| self.joins(word, next, true));
        }
        out
    }

    fn is_compound_prefix(word: &str) -> bool {
        // Only the segment after an earlier hyphen counts ("state-of-the-")
        let segment = word.rsplit('-').next().unwrap_or(word).to_lowercase();
        COMPOUND_PREFIXES.contains(&segment.as_str())
    }
}
