use crate::dictionary::Dictionaries;
use regex::Regex;
use std::sync::LazyLock;

static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\b(?:industry|sector)[:\t ]+(.+)$").expect("valid regex")
});

/// Canonical sector from an "industry:" / "sector:" line, else from any
/// alias in the title, else anywhere in the text.
pub fn suggest_sector(text: &str, title: &str, dict: &Dictionaries) -> String {
    let low = text.to_lowercase();

    let labeled = LABELED_LINE
        .captures_iter(&low)
        .find_map(|caps| alias_in(caps.get(1).map_or("", |m| m.as_str()), dict));

    labeled
        .or_else(|| alias_in(&title.to_lowercase(), dict))
        .or_else(|| alias_in(&low, dict))
        .unwrap_or_default()
}

fn alias_in(haystack: &str, dict: &Dictionaries) -> Option<String> {
    if haystack.trim().is_empty() {
        return None;
    }
    dict.sectors
        .iter()
        .find(|e| haystack.contains(&e.alias))
        .map(|e| e.sector.clone())
}
