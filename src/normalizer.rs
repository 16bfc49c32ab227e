// Canonical forms for the free-text fields that get compared across listings.
use crate::dictionary::Dictionaries;
use crate::utils::collapse_whitespace;
use regex::Regex;
use std::sync::LazyLock;

static WORD_TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d|\b)TO(\d|\b)").expect("valid regex"));
static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

const CURRENCY_MARKERS: &[&str] = &["US$", "USD", "$", "€", "£", "¥", "₽"];
const WORD_UNITS: &[(&str, &str)] = &[
    ("MILLIONS", "M"),
    ("THOUSANDS", "K"),
    ("BILLIONS", "B"),
    ("MILLION", "M"),
    ("THOUSAND", "K"),
    ("BILLION", "B"),
];

pub const PRIVILEGE_LEVELS: &[&str] = &["admin", "domain admin", "local admin", "user"];

/// Lowercase, single-spaced, restricted to `[a-z0-9 ._-]`.
pub fn normalize_broker_name(raw: &str) -> String {
    let lowered = collapse_whitespace(&raw.to_lowercase());
    let kept: String = lowered
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' ' | '.' | '_' | '-'))
        .collect();
    collapse_whitespace(&kept)
}

/// Maps a sector label to its canonical value: exact alias first, then the
/// first alias (in dictionary order) the label starts or ends with. Unknown
/// labels come back lowercased and single-spaced.
pub fn normalize_sector(raw: &str, dict: &Dictionaries) -> String {
    let label = collapse_whitespace(&raw.to_lowercase());
    if label.is_empty() {
        return label;
    }

    if let Some(sector) = dict.sector_for(&label) {
        return sector.to_string();
    }

    dict.sectors
        .iter()
        .find(|e| label.starts_with(&e.alias) || label.ends_with(&e.alias))
        .map(|e| e.sector.clone())
        .unwrap_or(label)
}

/// Compacts a revenue expression such as `"$10 to 25 million"` into `10-25M`.
/// Purely textual; the numbers are not checked.
pub fn normalize_revenue(raw: &str) -> String {
    let mut value = raw.trim().to_uppercase();
    if value.is_empty() {
        return value;
    }

    value = strip_currency(value);
    for (word, unit) in WORD_UNITS {
        value = value.replace(word, unit);
    }
    value = WORD_TO.replace_all(&value, "${1}-${2}").into_owned();
    value = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '_' { '-' } else { c })
        .collect();

    let value = strip_currency(value);
    HYPHEN_RUN.replace_all(&value, "-").into_owned()
}

fn strip_currency(mut value: String) -> String {
    loop {
        let before = value.len();
        for marker in CURRENCY_MARKERS {
            value = value.replace(marker, "");
        }
        if value.len() == before {
            return value;
        }
    }
}

/// Keeps the known privilege levels from a comma separated list, in order and
/// without repeats.
pub fn normalize_privilege(raw: &str) -> String {
    let mut levels: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let level = collapse_whitespace(&part.to_lowercase());
        if PRIVILEGE_LEVELS.contains(&level.as_str()) && !levels.contains(&level) {
            levels.push(level);
        }
    }
    levels.join(", ")
}
