// Core structs: Broker, Listing, ListingSuggestion, DuplicateKey
use crate::dictionary::{Dictionaries, is_iso_country};
use crate::normalizer::{normalize_privilege, normalize_revenue, normalize_sector};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Broker {
    pub id: i64,
    /// Canonical key, always `normalize_broker_name(raw_name)`.
    pub name: String,
    pub raw_name: String,
    pub notes: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: i64,
    pub broker_id: i64,
    pub access_type: String,
    pub country: String,
    pub privilege: String,
    pub price: String,
    pub description: String,
    pub source: String,
    pub post_date: String,
    pub sector: String,
    pub revenue: String,
    pub raw_title: Option<String>,
    pub raw_text: Option<String>,
    pub raw_url: Option<String>,
    pub created_at: String,
}

/// Listing fields as entered or suggested, before they get an id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewListing {
    pub broker_id: i64,
    pub access_type: String,
    pub country: String,
    pub privilege: String,
    pub price: String,
    pub description: String,
    pub source: String,
    pub post_date: String,
    pub sector: String,
    pub revenue: String,
    pub raw_title: Option<String>,
    pub raw_text: Option<String>,
    pub raw_url: Option<String>,
}

impl NewListing {
    /// Seeds a listing from extraction output. Source and raw fields are left
    /// for the caller.
    pub fn from_suggestion(broker_id: i64, suggestion: &ListingSuggestion) -> Self {
        Self {
            broker_id,
            access_type: suggestion.access_type.clone(),
            country: suggestion.country.clone(),
            privilege: suggestion.privilege.clone(),
            price: suggestion.price.clone(),
            description: suggestion.description.clone(),
            post_date: suggestion.post_date.clone(),
            sector: suggestion.sector.clone(),
            revenue: suggestion.revenue.clone(),
            ..Self::default()
        }
    }

    /// Applies the canonicalizers to the free-text fields that are compared
    /// for duplicates.
    pub fn canonicalized(&self, dict: &Dictionaries) -> Self {
        Self {
            access_type: self.access_type.trim().to_lowercase(),
            country: self.country.trim().to_uppercase(),
            privilege: normalize_privilege(&self.privilege),
            price: self.price.trim().to_string(),
            description: self.description.trim().to_string(),
            source: self.source.trim().to_string(),
            post_date: self.post_date.trim().to_string(),
            sector: normalize_sector(&self.sector, dict),
            revenue: normalize_revenue(&self.revenue),
            ..self.clone()
        }
    }

    /// Checks the stored-record invariants on already canonical fields.
    pub fn validate(&self) -> Result<(), StorageError> {
        if !self.post_date.is_empty()
            && NaiveDate::parse_from_str(&self.post_date, "%Y-%m-%d").is_err()
        {
            return Err(StorageError::InvalidPostDate(self.post_date.clone()));
        }
        if !self.country.is_empty() && !is_iso_country(&self.country) {
            return Err(StorageError::InvalidCountry(self.country.clone()));
        }
        Ok(())
    }
}

impl From<&Listing> for NewListing {
    fn from(l: &Listing) -> Self {
        Self {
            broker_id: l.broker_id,
            access_type: l.access_type.clone(),
            country: l.country.clone(),
            privilege: l.privilege.clone(),
            price: l.price.clone(),
            description: l.description.clone(),
            source: l.source.clone(),
            post_date: l.post_date.clone(),
            sector: l.sector.clone(),
            revenue: l.revenue.clone(),
            raw_title: l.raw_title.clone(),
            raw_text: l.raw_text.clone(),
            raw_url: l.raw_url.clone(),
        }
    }
}

/// Output of the extraction engine. An empty string means "no suggestion".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingSuggestion {
    pub access_type: String,
    pub country: String,
    pub privilege: String,
    pub price: String,
    pub sector: String,
    pub revenue: String,
    pub post_date: String,
    pub description: String,
}

impl ListingSuggestion {
    pub const FIELD_NAMES: [&'static str; 8] = [
        "access_type",
        "country",
        "privilege",
        "price",
        "sector",
        "revenue",
        "post_date",
        "description",
    ];

    /// Field name / value pairs in a fixed order.
    pub fn fields(&self) -> [(&'static str, &str); 8] {
        let values = [
            self.access_type.as_str(),
            self.country.as_str(),
            self.privilege.as_str(),
            self.price.as_str(),
            self.sector.as_str(),
            self.revenue.as_str(),
            self.post_date.as_str(),
            self.description.as_str(),
        ];
        let mut out = [("", ""); 8];
        for (i, value) in values.into_iter().enumerate() {
            out[i] = (Self::FIELD_NAMES[i], value);
        }
        out
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }
}

/// The nine fields two listings must share exactly to be flagged as likely
/// duplicates. Privilege and the raw capture fields are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub broker: String,
    pub access_type: String,
    pub country: String,
    pub price: String,
    pub source: String,
    pub post_date: String,
    pub sector: String,
    pub revenue: String,
    pub description: String,
}

impl DuplicateKey {
    /// `broker` is the broker's normalized name; `listing` must already be
    /// canonical.
    pub fn new(broker: &str, listing: &NewListing) -> Self {
        Self {
            broker: broker.to_string(),
            access_type: listing.access_type.clone(),
            country: listing.country.clone(),
            price: listing.price.clone(),
            source: listing.source.clone(),
            post_date: listing.post_date.clone(),
            sector: listing.sector.clone(),
            revenue: listing.revenue.clone(),
            description: listing.description.clone(),
        }
    }

    pub fn is_duplicate_of(&self, other: &DuplicateKey) -> bool {
        self == other
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("broker name {0:?} is empty after normalization")]
    EmptyBrokerName(String),
    #[error("post date must be a valid YYYY-MM-DD date, got {0:?}")]
    InvalidPostDate(String),
    #[error("country must be empty or an ISO alpha-2 code, got {0:?}")]
    InvalidCountry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("cannot read dictionary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dictionary file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern for access type {access}: {source}")]
    InvalidPattern {
        access: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown ISO country code {0:?}")]
    UnknownCountry(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Refused(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> NewListing {
        NewListing {
            broker_id: 1,
            access_type: "rdp".into(),
            country: "US".into(),
            privilege: "domain admin".into(),
            price: "START 700".into(),
            description: "hospital | RDP".into(),
            source: "xss".into(),
            post_date: "2024-03-01".into(),
            sector: "healthcare".into(),
            revenue: "10-25M".into(),
            ..NewListing::default()
        }
    }

    #[test]
    fn privilege_is_not_part_of_duplicate_key() {
        let a = listing();
        let mut b = listing();
        b.privilege = "user".into();
        assert!(DuplicateKey::new("broker", &a).is_duplicate_of(&DuplicateKey::new("broker", &b)));
    }

    #[test]
    fn any_key_field_difference_breaks_duplicate() {
        let a = DuplicateKey::new("broker", &listing());
        let mut other = listing();
        other.price = "START 800".into();
        assert!(!a.is_duplicate_of(&DuplicateKey::new("broker", &other)));
        assert!(!a.is_duplicate_of(&DuplicateKey::new("other", &listing())));

        let mut cased = listing();
        cased.source = "XSS".into();
        assert!(!a.is_duplicate_of(&DuplicateKey::new("broker", &cased)));
    }

    #[test]
    fn validate_rejects_impossible_dates_and_codes() {
        let mut l = listing();
        l.post_date = "2024-13-01".into();
        assert!(matches!(l.validate(), Err(StorageError::InvalidPostDate(_))));

        let mut l = listing();
        l.country = "XX".into();
        assert!(matches!(l.validate(), Err(StorageError::InvalidCountry(_))));

        let mut l = listing();
        l.post_date.clear();
        l.country.clear();
        assert!(l.validate().is_ok());
    }

    #[test]
    fn canonicalized_normalizes_free_text_fields() {
        let dict = Dictionaries::builtin();
        let raw = NewListing {
            country: " us ".into(),
            privilege: "User, Domain Admin, user".into(),
            sector: "  Hospital ".into(),
            revenue: "$10 to 25 million".into(),
            ..NewListing::default()
        };
        let c = raw.canonicalized(dict);
        assert_eq!(c.country, "US");
        assert_eq!(c.privilege, "user, domain admin");
        assert_eq!(c.sector, "healthcare");
        assert_eq!(c.revenue, "10-25M");
    }

    #[test]
    fn suggestion_exposes_eight_named_fields() {
        let s = ListingSuggestion {
            country: "DE".into(),
            ..ListingSuggestion::default()
        };
        assert_eq!(s.fields().len(), 8);
        assert_eq!(s.get("country"), Some("DE"));
        assert_eq!(s.get("price"), Some(""));
        assert_eq!(s.get("nope"), None);
    }
}
