use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

const TIER_KEYWORDS: &[&str] = &["start", "step", "blitz", "flash"];
const MAX_LOOSE_PRICES: usize = 3;

static TIER_AMOUNTS: LazyLock<Vec<(String, Regex)>> = LazyLock::new(|| {
    TIER_KEYWORDS
        .iter()
        .map(|kw| {
            let re = Regex::new(&format!(r"{kw}[:=\s]+\$?\s*(\d[\d,]*)")).expect("valid regex");
            (kw.to_uppercase(), re)
        })
        .collect()
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("valid regex"));
static MAGNITUDE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^\s*(?:millions?|thousands?|billions?|mln|bn|m|k|b)\b")
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

/// Auction tiers (`START 700, STEP 200`) if any line has them, otherwise up
/// to three distinct amounts from lines that mention "price". Numbers on
/// other lines are ignored.
pub fn suggest_price(text: &str) -> String {
    let mut tiers: Vec<String> = Vec::new();
    let mut loose: Vec<String> = Vec::new();

    for line in text.lines() {
        let low = line.trim().to_lowercase();
        if low.is_empty() {
            continue;
        }

        if TIER_KEYWORDS.iter().any(|kw| low.contains(kw)) {
            for (label, re) in TIER_AMOUNTS.iter() {
                if let Some(caps) = re.captures(&low) {
                    tiers.push(format!("{label} {}", caps[1].replace(',', "")));
                }
            }
            continue;
        }

        if low.contains("price") {
            for m in NUMBER.find_iter(line) {
                if MAGNITUDE_SUFFIX.is_match(&line[m.end()..]) {
                    continue;
                }
                let amount = m.as_str().trim_end_matches(['.', ',']).replace(',', "");
                if !amount.is_empty() && !loose.contains(&amount) {
                    loose.push(amount);
                }
            }
        }
    }

    if !tiers.is_empty() {
        return tiers.join(", ");
    }
    loose.truncate(MAX_LOOSE_PRICES);
    loose.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auction_tiers_on_one_line() {
        assert_eq!(
            suggest_price("START 700, STEP 200, BLITZ 1900 USD"),
            "START 700, STEP 200, BLITZ 1900"
        );
    }

    #[test]
    fn tiers_across_lines_strip_separators() {
        let text = "Start: $1,500\nStep = 100\nFlash 3,000";
        assert_eq!(suggest_price(text), "START 1500, STEP 100, FLASH 3000");
    }

    #[test]
    fn tiers_beat_loose_prices() {
        let text = "Price: 900\nstart 500";
        assert_eq!(suggest_price(text), "START 500");
    }

    #[test]
    fn loose_prices_skip_revenue_numbers() {
        assert_eq!(suggest_price("Price 1500$, revenue 20M"), "1500");
        assert_eq!(suggest_price("price: 2k or 800"), "800");
        assert_eq!(suggest_price("price 500 bucks"), "500");
        assert_eq!(suggest_price("price 900, revenue 10 millions"), "900");
        assert_eq!(suggest_price("price 700, 3 thousands employees"), "700");
    }

    #[test]
    fn loose_prices_are_distinct_and_capped() {
        let text = "price 100\nprice 100, 200\nprice 300 or 400";
        assert_eq!(suggest_price(text), "100, 200, 300");
    }

    #[test]
    fn numbers_without_price_word_are_dropped() {
        assert_eq!(suggest_price("selling for 1200 usd"), "");
        assert_eq!(suggest_price(""), "");
    }
}
