//! Running header and footer detection.
//!
//! Short sentences such as "12", "CHAPTER 3" or "Table 2" repeat on many
//! pages and would anchor the cursor to the wrong page if trusted.

use regex::Regex;
use std::sync::OnceLock;

static PAGE_NUMBER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static ALL_CAPS_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static CAPTION_PREFIX_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn get_page_number_regex() -> Option<&'static Regex> {
    PAGE_NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^[-\s]*\d+[-\s]*[.)]?$").ok())
        .as_ref()
}

fn get_all_caps_regex() -> Option<&'static Regex> {
    ALL_CAPS_REGEX
        .get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9 .:\-]+$").ok())
        .as_ref()
}

fn get_caption_prefix_regex() -> Option<&'static Regex> {
    CAPTION_PREFIX_REGEX
        .get_or_init(|| Regex::new(r"(?i)^(page|chapter|section|table|figure|fig)\b").ok())
        .as_ref()
}

/// Whether a sentence looks like a running header, footer or caption label.
///
/// Only sentences shorter than `max_len` characters (after trimming) are
/// considered; anything longer is treated as prose.
pub fn is_header_like(text: &str, max_len: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() >= max_len {
        return false;
    }

    [get_page_number_regex(), get_all_caps_regex(), get_caption_prefix_regex()]
        .into_iter()
        .flatten()
        .any(|re| re.is_match(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbers() {
        assert!(is_header_like("12", 20));
        assert!(is_header_like(" 7 ", 20));
        assert!(is_header_like("- 3 -", 20));
    }

    #[test]
    fn test_all_caps_runs() {
        assert!(is_header_like("INTRODUCTION", 20));
        assert!(is_header_like("RESULTS: PART 2", 20));
        assert!(!is_header_like("A", 20));
    }

    #[test]
    fn test_caption_prefixes() {
        assert!(is_header_like("Table 2", 20));
        assert!(is_header_like("Figure 3.", 20));
        assert!(is_header_like("Page 4 of 10", 20));
        assert!(is_header_like("chapter one", 20));
    }

    #[test]
    fn test_prose_not_header() {
        assert!(!is_header_like("It works.", 20));
        assert!(!is_header_like("Tables were drawn.", 20));
    }

    #[test]
    fn test_long_text_never_header() {
        assert!(!is_header_like("TABLE OF CONTENTS AND INDEX", 20));
        assert!(!is_header_like("Table 2 shows the main results", 20));
    }
}
