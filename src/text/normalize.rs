//! Search-surface normalization.

/// Expand a typographic ligature into its letters.
fn expand_ligature(c: char) -> Option<&'static str> {
    match c {
        '\u{FB00}' => Some("ff"),
        '\u{FB01}' => Some("fi"),
        '\u{FB02}' => Some("fl"),
        '\u{FB03}' => Some("ffi"),
        '\u{FB04}' => Some("ffl"),
        '\u{FB05}' | '\u{FB06}' => Some("st"),
        _ => None,
    }
}

/// Fold typographic punctuation onto its ASCII form.
fn fold_punctuation(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => '"',
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
        other => other,
    }
}

/// Normalize text for substring search.
///
/// Lower-cases, expands ligatures, drops soft hyphens and zero-width
/// characters, folds typographic quotes and dashes, and collapses whitespace
/// runs into single spaces. The result is trimmed.
///
/// # Examples
///
/// ```
/// use evidence_lens::text::normalize_for_search;
///
/// assert_eq!(normalize_for_search("  The \u{FB01}rst   Result "), "the first result");
/// assert_eq!(normalize_for_search("busi\u{00AD}ness"), "business");
/// ```
pub fn normalize_for_search(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}') {
            continue;
        }
        let c = fold_punctuation(c);
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match expand_ligature(c) {
            Some(letters) => out.push_str(letters),
            None => out.extend(c.to_lowercase()),
        }
    }

    out
}

/// Split normalized text into word tokens.
///
/// Tokens are whitespace-separated runs with leading and trailing punctuation
/// removed (a trailing `%` is kept, so "92%" stays one token). Tokens that
/// are pure punctuation are dropped.
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(|raw| {
            raw.trim_start_matches(|c: char| !c.is_alphanumeric())
                .trim_end_matches(|c: char| !c.is_alphanumeric() && c != '%')
        })
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}
