use regex::Regex;
use std::sync::LazyLock;

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bno\s+(?:domain\s+admin(?:istrator)?|da|admin(?:istrator)?)s?\b")
        .expect("valid regex")
});

struct Rule {
    level: &'static str,
    pattern: Regex,
    /// Levels that, once detected, suppress this one.
    unless: &'static [&'static str],
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let rule = |level: &'static str, pattern: &str, unless: &'static [&'static str]| Rule {
        level,
        pattern: Regex::new(pattern).expect("valid regex"),
        unless,
    };
    vec![
        rule(
            "domain admin",
            r"\bdomain\s+admin(?:istrator)?s?\b|\bda\b",
            &[],
        ),
        rule("local admin", r"\blocal\s+admin(?:istrator)?s?\b", &[]),
        rule(
            "admin",
            r"\badmin(?:istrator)?s?\b",
            &["domain admin", "local admin"],
        ),
        rule("user", r"\busers?\b", &[]),
    ]
});

/// Comma separated privilege levels in detection order. An explicit
/// "no domain admin" / "no da" / "no admin" clears everything.
pub fn suggest_privilege(text: &str) -> String {
    let low = text.to_lowercase();
    if NEGATION.is_match(&low) {
        return String::new();
    }

    let mut found: Vec<&str> = Vec::new();
    for rule in RULES.iter() {
        if rule.unless.iter().any(|level| found.contains(level)) {
            continue;
        }
        if rule.pattern.is_match(&low) && !found.contains(&rule.level) {
            found.push(rule.level);
        }
    }
    found.join(", ")
}
