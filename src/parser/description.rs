use crate::utils::truncate_with_ellipsis;
use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

static UPPER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2})\b").expect("valid regex"));
static REVENUE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(\d+(?:\.\d+)?)\s*([mbk])\b")
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

const ACCESS_KEYWORDS: &[(&str, &str)] = &[("rdp", "RDP"), ("vpn", "VPN"), ("ssh", "SSH")];

/// Fallback description: `title | ACCESS | CC | 10M`, skipping parts that
/// are not found, cut to `max_len` characters.
pub fn build_description(title: &str, text: &str, max_len: usize) -> String {
    let low = text.to_lowercase();

    let access = ACCESS_KEYWORDS
        .iter()
        .find(|(kw, _)| low.contains(kw))
        .map(|(_, label)| label.to_string());
    let token = UPPER_TOKEN.captures(text).map(|c| c[1].to_string());
    let revenue = REVENUE_TOKEN
        .captures(text)
        .map(|c| format!("{}{}", &c[1], c[2].to_uppercase()));

    let parts: Vec<String> = std::iter::once(Some(title.trim().to_string()))
        .chain([access, token, revenue])
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();

    truncate_with_ellipsis(&parts.join(" | "), max_len)
}
