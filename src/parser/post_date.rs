use crate::utils::parse_date;
use regex::Regex;
use std::sync::LazyLock;

static DATE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\b(\d{4}-\d{2}-\d{2})\b", "%Y-%m-%d"),
        (r"\b(\d{2}\.\d{2}\.\d{4})\b", "%d.%m.%Y"),
        (r"\b(\d{4}/\d{2}/\d{2})\b", "%Y/%m/%d"),
    ]
    .into_iter()
    .map(|(pattern, fmt)| (Regex::new(pattern).expect("valid regex"), fmt))
    .collect()
});

/// First real calendar date in the text, as `YYYY-MM-DD`. Formats are tried
/// in a fixed order; impossible dates are skipped.
pub fn suggest_post_date(text: &str) -> String {
    DATE_PATTERNS
        .iter()
        .find_map(|(re, fmt)| {
            re.captures_iter(text)
                .find_map(|caps| parse_date(&caps[1], fmt))
        })
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_dates_pass_through() {
        assert_eq!(suggest_post_date("posted 2024-03-07 by seller"), "2024-03-07");
    }

    #[test]
    fn dotted_and_slashed_dates_are_reformatted() {
        assert_eq!(suggest_post_date("Date: 31.12.2023"), "2023-12-31");
        assert_eq!(suggest_post_date("2024/01/15"), "2024-01-15");
    }

    #[test]
    fn pattern_order_beats_text_order() {
        assert_eq!(suggest_post_date("05.05.2022 then 2023-01-01"), "2023-01-01");
    }

    #[test]
    fn impossible_dates_are_skipped() {
        assert_eq!(suggest_post_date("2024-13-01"), "");
        assert_eq!(suggest_post_date("2024-13-01 or 2024-02-10"), "2024-02-10");
        assert_eq!(suggest_post_date("2023-02-30\n01.02.2023"), "2023-02-01");
    }

    #[test]
    fn missing_date() {
        assert_eq!(suggest_post_date("yesterday"), "");
        assert_eq!(suggest_post_date(""), "");
    }
}
