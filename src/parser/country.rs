use crate::dictionary::{CountryTerms, Dictionaries, is_iso_country};
use crate::utils::contains_term;
use regex::Regex;
use std::sync::LazyLock;

static BRACKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[({]([A-Z]{2})[\])}]").expect("valid regex"));
static UPPER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\b").expect("valid regex"));

type Tier = fn(&str, &Dictionaries) -> Option<String>;

/// Tried in order inside each scope; the first tier with a hit wins.
const TIERS: &[Tier] = &[bracket_tag, uppercase_token, keyword, alias];

/// ISO alpha-2 code for the post, looking at the title before the whole text.
pub fn suggest_country(text: &str, title: &str, dict: &Dictionaries) -> String {
    [title, text]
        .into_iter()
        .filter(|scope| !scope.trim().is_empty())
        .find_map(|scope| TIERS.iter().find_map(|tier| tier(scope, dict)))
        .unwrap_or_default()
}

fn first_iso_capture(re: &Regex, scope: &str) -> Option<String> {
    re.captures_iter(scope)
        .map(|caps| caps[1].to_string())
        .find(|code| is_iso_country(code))
}

fn bracket_tag(scope: &str, _dict: &Dictionaries) -> Option<String> {
    first_iso_capture(&BRACKET_TAG, scope)
}

fn uppercase_token(scope: &str, _dict: &Dictionaries) -> Option<String> {
    first_iso_capture(&UPPER_TOKEN, scope)
}

fn keyword(scope: &str, dict: &Dictionaries) -> Option<String> {
    term_match(scope, &dict.country_keywords)
}

fn alias(scope: &str, dict: &Dictionaries) -> Option<String> {
    term_match(scope, &dict.country_aliases)
}

fn term_match(scope: &str, table: &[CountryTerms]) -> Option<String> {
    let low = scope.to_lowercase();
    table
        .iter()
        .find(|entry| entry.terms.iter().any(|t| contains_term(&low, t)))
        .map(|entry| entry.code.clone())
}
