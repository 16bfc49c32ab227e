// Heuristic field extraction from raw marketplace posts.
//
// Each submodule is one detector: a pure function of the post text (and the
// dictionaries) that returns a suggestion or an empty string.

pub mod access;
pub mod country;
pub mod description;
pub mod post_date;
pub mod price;
pub mod privilege;
pub mod revenue;
pub mod sector;

use crate::dictionary::Dictionaries;
use crate::model::ListingSuggestion;
use tracing::debug;

pub const DEFAULT_DESCRIPTION_MAX_LEN: usize = 200;

pub trait Parser {
    fn suggest(&self, raw_title: &str, raw_text: &str) -> ListingSuggestion;
}

#[derive(Debug, Clone)]
pub struct PostParser {
    dict: Dictionaries,
    description_max_len: usize,
}

impl PostParser {
    pub fn new(dict: Dictionaries) -> Self {
        Self {
            dict,
            description_max_len: DEFAULT_DESCRIPTION_MAX_LEN,
        }
    }

    pub fn with_description_max_len(mut self, max_len: usize) -> Self {
        self.description_max_len = max_len;
        self
    }

    pub fn dictionaries(&self) -> &Dictionaries {
        &self.dict
    }
}

impl Default for PostParser {
    fn default() -> Self {
        Self::new(Dictionaries::builtin().clone())
    }
}

impl Parser for PostParser {
    fn suggest(&self, raw_title: &str, raw_text: &str) -> ListingSuggestion {
        let combined = format!("{raw_title}\n{raw_text}");
        let dict = &self.dict;

        let suggestion = ListingSuggestion {
            access_type: access::suggest_access_type(&combined, raw_title, dict),
            country: country::suggest_country(&combined, raw_title, dict),
            privilege: privilege::suggest_privilege(&combined),
            price: price::suggest_price(&combined),
            sector: sector::suggest_sector(&combined, raw_title, dict),
            revenue: revenue::suggest_revenue(&combined),
            post_date: post_date::suggest_post_date(&combined),
            description: description::build_description(
                raw_title,
                raw_text,
                self.description_max_len,
            ),
        };
        debug!("Suggested fields: {:?}", suggestion);
        suggestion
    }
}

/// Runs every detector with the built-in dictionaries.
pub fn suggest_listing_fields(raw_title: &str, raw_text: &str) -> ListingSuggestion {
    PostParser::default().suggest(raw_title, raw_text)
}
