use crate::dictionary::Dictionaries;

/// First access pattern (in dictionary order) found in the title, otherwise
/// in the whole text.
pub fn suggest_access_type(text: &str, title: &str, dict: &Dictionaries) -> String {
    [title, text]
        .into_iter()
        .filter(|scope| !scope.trim().is_empty())
        .find_map(|scope| first_pattern_hit(scope, dict))
        .unwrap_or_default()
}

fn first_pattern_hit(scope: &str, dict: &Dictionaries) -> Option<String> {
    dict.access_patterns
        .iter()
        .find(|p| p.regex.is_match(scope))
        .map(|p| p.access.clone())
}
