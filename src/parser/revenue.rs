use crate::normalizer::normalize_revenue;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

const UNIT: &str = r"(millions?|thousands?|billions?|mln|bn|m|k|b)\b";

fn build(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

static SLANG_KK: LazyLock<Regex> = LazyLock::new(|| build(r"\b(\d+)\s*kk\b"));
static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"\b(\d+(?:[.,]\d+)?)\s*(?:-|–|to)\s*(\d+(?:[.,]\d+)?)\s*{UNIT}"
    ))
});
static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"\b(?:revenue|turnover|income)\s*[:\-]*\s*[<$~\s]*(\d[\d.,]*?)\s*{UNIT}"
    ))
});
static GENERIC: LazyLock<Regex> =
    LazyLock::new(|| build(&format!(r"\b(\d+(?:\.\d+)?)\s*{UNIT}")));

type Tier = fn(&str) -> Option<String>;

/// Highest tier with a match decides; lower tiers are not consulted.
const TIERS: &[Tier] = &[slang_kk, range, labeled, generic];

/// Revenue in canonical form (`50M`, `10-25M`), or empty.
pub fn suggest_revenue(text: &str) -> String {
    TIERS
        .iter()
        .find_map(|tier| tier(text))
        .map(|raw| normalize_revenue(&raw))
        .unwrap_or_default()
}

fn unit_letter(unit: &str) -> &'static str {
    match unit.to_lowercase().as_str() {
        "k" | "thousand" | "thousands" => "K",
        "b" | "bn" | "billion" | "billions" => "B",
        _ => "M",
    }
}

fn amount(raw: &str) -> String {
    raw.replace(',', "").trim_end_matches('.').to_string()
}

fn slang_kk(text: &str) -> Option<String> {
    SLANG_KK.captures(text).map(|c| format!("{}M", &c[1]))
}

fn range(text: &str) -> Option<String> {
    RANGE.captures(text).map(|c| {
        format!("{}-{}{}", amount(&c[1]), amount(&c[2]), unit_letter(&c[3]))
    })
}

fn labeled(text: &str) -> Option<String> {
    LABELED
        .captures(text)
        .map(|c| format!("{}{}", amount(&c[1]), unit_letter(&c[2])))
}

fn generic(text: &str) -> Option<String> {
    GENERIC
        .captures(text)
        .map(|c| format!("{}{}", amount(&c[1]), unit_letter(&c[2])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slang_kk_means_million() {
        assert_eq!(suggest_revenue("50kk"), "50M");
        assert_eq!(suggest_revenue("rev ~ 120 KK, 10-25M"), "120M");
    }

    #[test]
    fn range_keeps_both_bounds() {
        assert_eq!(suggest_revenue("revenue 10-25M"), "10-25M");
        assert_eq!(suggest_revenue("between 1.5 to 2 billion"), "1.5-2B");
        assert_eq!(suggest_revenue("Revenue: 28M, grew from 5 – 10 mln"), "5-10M");
    }

    #[test]
    fn labeled_line() {
        assert_eq!(suggest_revenue("revenue: 28M"), "28M");
        assert_eq!(suggest_revenue("Turnover - $1,200 thousand"), "1200K");
        assert_eq!(suggest_revenue("3 employees\nincome < 7 Million"), "7M");
    }

    #[test]
    fn labeled_line_beats_generic_tokens() {
        assert_eq!(suggest_revenue("5k users, revenue 40M"), "40M");
    }

    #[test]
    fn plural_unit_words() {
        assert_eq!(suggest_revenue("revenue 10 millions"), "10M");
        assert_eq!(suggest_revenue("from 2 to 3 billions"), "2-3B");
        assert_eq!(suggest_revenue("about 800 thousands a year"), "800K");
    }

    #[test]
    fn generic_token_anywhere() {
        assert_eq!(suggest_revenue("company makes $300m a year"), "300M");
        assert_eq!(suggest_revenue("2.5B company"), "2.5B");
    }

    #[test]
    fn no_revenue_signal() {
        assert_eq!(suggest_revenue("500 bucks, rdp"), "");
        assert_eq!(suggest_revenue(""), "");
    }
}
