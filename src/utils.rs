// Utility functions
use chrono::NaiveDate;

const ELLIPSIS: &str = "...";

/// Parses a calendar date with the given chrono format, if possible.
pub fn parse_date(date_str: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str, fmt).ok()
}

/// Trims and collapses every run of whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-sensitive term search. ASCII terms must stand as whole words
/// (neighbours are not alphanumeric or `_`); other terms, such as flag
/// emoji, match anywhere.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if !term.is_ascii() {
        return haystack.contains(term);
    }

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = term.starts_with(is_word);
    let ends_word = term.ends_with(is_word);

    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before_ok = !starts_word || !haystack[..start].chars().next_back().is_some_and(is_word);
        let after_ok = !ends_word || !haystack[end..].chars().next().is_some_and(is_word);
        before_ok && after_ok
    })
}

/// Cuts `text` to at most `max_chars` characters, ending with "..." when cut.
/// Limits too small to hold the ellipsis get a plain cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars < ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
