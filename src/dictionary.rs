//! Lookup tables shared by the canonicalizer and the field detectors.
//!
//! Every table is an ordered list. Lookups walk it front to back and the first
//! hit wins, so the order of entries is the tie-break rule. The built-in
//! tables can be replaced per table by a JSON dictionary file.

use crate::model::DictionaryError;
use crate::utils::collapse_whitespace;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

/// ISO 3166-1 alpha-2 codes. Closed whitelist for two-letter candidates.
const ISO_COUNTRY_CODES: &[&str] = &[
    "AF", "AX", "AL", "DZ", "AS", "AD", "AO", "AI", "AQ", "AG", "AR", "AM", "AW", "AU", "AT", "AZ",
    "BS", "BH", "BD", "BB", "BY", "BE", "BZ", "BJ", "BM", "BT", "BO", "BQ", "BA", "BW", "BV", "BR",
    "IO", "BN", "BG", "BF", "BI", "KH", "CM", "CA", "CV", "KY", "CF", "TD", "CL", "CN", "CX", "CC",
    "CO", "KM", "CD", "CG", "CK", "CR", "CI", "HR", "CU", "CW", "CY", "CZ", "DK", "DJ", "DM", "DO",
    "EC", "EG", "SV", "GQ", "ER", "EE", "SZ", "ET", "FK", "FO", "FJ", "FI", "FR", "GF", "PF", "TF",
    "GA", "GM", "GE", "DE", "GH", "GI", "GR", "GL", "GD", "GP", "GU", "GT", "GG", "GN", "GW", "GY",
    "HT", "HM", "VA", "HN", "HK", "HU", "IS", "IN", "ID", "IR", "IQ", "IE", "IM", "IL", "IT", "JM",
    "JP", "JE", "JO", "KZ", "KE", "KI", "KP", "KR", "KW", "KG", "LA", "LV", "LB", "LS", "LR", "LY",
    "LI", "LT", "LU", "MO", "MG", "MW", "MY", "MV", "ML", "MT", "MH", "MQ", "MR", "MU", "YT", "MX",
    "FM", "MD", "MC", "MN", "ME", "MS", "MA", "MZ", "MM", "NA", "NR", "NP", "NL", "NC", "NZ", "NI",
    "NE", "NG", "NU", "NF", "MP", "NO", "OM", "PK", "PW", "PS", "PA", "PG", "PY", "PE", "PH", "PN",
    "PL", "PT", "PR", "QA", "MK", "RO", "RU", "RW", "RE", "BL", "SH", "KN", "LC", "MF", "PM", "VC",
    "WS", "SM", "ST", "SA", "SN", "RS", "SC", "SL", "SG", "SX", "SK", "SI", "SB", "SO", "ZA", "GS",
    "SS", "ES", "LK", "SD", "SR", "SJ", "SE", "CH", "SY", "TW", "TJ", "TZ", "TH", "TL", "TG", "TK",
    "TO", "TT", "TN", "TR", "TM", "TC", "TV", "UG", "UA", "AE", "GB", "US", "UM", "UY", "UZ", "VU",
    "VE", "VN", "VG", "VI", "WF", "EH", "YE", "ZM", "ZW",
];

static ISO_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ISO_COUNTRY_CODES.iter().copied().collect());

pub fn is_iso_country(code: &str) -> bool {
    ISO_SET.contains(code)
}

// (alias, canonical sector). Aliases are matched as plain substrings of
// post text, so short words that hide inside common words ("media" in
// "immediate", "legal" in "illegal", "tech" in "technique") only appear as
// part of a longer phrase.
const SECTOR_ALIASES: &[(&str, &str)] = &[
    ("government", "government"),
    ("gov", "government"),
    ("public sector", "government"),
    ("municipality", "government"),
    ("municipal", "government"),
    ("ministry", "government"),
    ("city council", "government"),
    ("education", "education"),
    ("university", "education"),
    ("college", "education"),
    ("school", "education"),
    ("academy", "education"),
    ("healthcare", "healthcare"),
    ("health care", "healthcare"),
    ("health", "healthcare"),
    ("hospital", "healthcare"),
    ("medical", "healthcare"),
    ("clinic", "healthcare"),
    ("pharma", "healthcare"),
    ("dental", "healthcare"),
    ("finance", "finance"),
    ("financial", "finance"),
    ("banking", "finance"),
    ("bank", "finance"),
    ("insurance", "finance"),
    ("fintech", "finance"),
    ("credit union", "finance"),
    ("investment", "finance"),
    ("accounting", "finance"),
    ("technology", "technology"),
    ("software", "technology"),
    ("saas", "technology"),
    ("it services", "technology"),
    ("hosting", "technology"),
    ("tech company", "technology"),
    ("tech firm", "technology"),
    ("tech startup", "technology"),
    ("retail", "retail"),
    ("e-commerce", "retail"),
    ("ecommerce", "retail"),
    ("online store", "retail"),
    ("online shop", "retail"),
    ("supermarket", "retail"),
    ("wholesale", "retail"),
    ("energy", "energy"),
    ("oil and gas", "energy"),
    ("oil & gas", "energy"),
    ("utilities", "energy"),
    ("power plant", "energy"),
    ("electric", "energy"),
    ("solar", "energy"),
    ("manufacturing", "manufacturing"),
    ("manufacturer", "manufacturing"),
    ("industrial", "manufacturing"),
    ("factory", "manufacturing"),
    ("automotive", "manufacturing"),
    ("telecom", "telecom"),
    ("telecommunications", "telecom"),
    ("telco", "telecom"),
    ("internet provider", "telecom"),
    ("internet service provider", "telecom"),
    ("mobile operator", "telecom"),
    ("logistics", "logistics"),
    ("transportation", "logistics"),
    ("shipping", "logistics"),
    ("freight", "logistics"),
    ("trucking", "logistics"),
    ("construction", "construction"),
    ("real estate", "construction"),
    ("architecture", "construction"),
    ("legal services", "legal"),
    ("legal firm", "legal"),
    ("law firm", "legal"),
    ("law office", "legal"),
    ("hospitality", "hospitality"),
    ("hotel", "hospitality"),
    ("restaurant", "hospitality"),
    ("tourism", "hospitality"),
    ("media company", "media"),
    ("media group", "media"),
    ("media agency", "media"),
    ("mass media", "media"),
    ("entertainment", "media"),
    ("publishing", "media"),
    ("advertising", "media"),
    ("agriculture", "agriculture"),
    ("farming", "agriculture"),
    ("non-profit", "non-profit"),
    ("nonprofit", "non-profit"),
    ("charity", "non-profit"),
];

const ACCESS_PATTERNS: &[(&str, &str)] = &[
    ("rdp", r"\brdp\b|\b3389\b"),
    ("vpn", r"\bvpn\b|\banyconnect\b|\bopenvpn\b"),
    ("citrix", r"\bcitrix\b"),
    ("ssh", r"\bssh\b"),
    ("vnc", r"\bvnc\b"),
    ("owa", r"\bowa\b|\bwebmail\b"),
    ("fortinet", r"\bforti(gate|client|net)?\b"),
    ("rdweb", r"\brdweb\b|\bremote desktop\b"),
    ("hyperv", r"\bhyper[-\s]?v\b"),
];

const COUNTRY_KEYWORDS: &[(&str, &[&str])] = &[
    ("US", &["united states", "america", "yank", "yanks", "states"]),
    ("GB", &["united kingdom", "england", "britain", "scotland", "wales"]),
    ("DE", &["germany", "deutschland", "deutsch"]),
    ("ES", &["spain", "españa"]),
    ("FR", &["france"]),
    ("IT", &["italy", "italia"]),
    ("NL", &["netherlands", "holland"]),
    ("RU", &["russia", "rossiya"]),
    ("UA", &["ukraine"]),
    ("CN", &["china", "prc"]),
    ("IN", &["india", "bharat"]),
    ("JP", &["japan"]),
    ("BR", &["brazil", "brasil"]),
    ("AU", &["australia"]),
    ("CA", &["canada"]),
    ("MX", &["mexico", "méxico"]),
];

// Two-letter English words ("us", "it", "es", "ca", "de", "au") are left out:
// as whole words they fire on ordinary prose.
const COUNTRY_ALIASES: &[(&str, &[&str])] = &[
    ("US", &["usa", "u.s.a.", "u.s.", "u.s", "american", "murica", "🇺🇸"]),
    ("GB", &["uk", "gb", "british", "brits", "🇬🇧"]),
    ("RU", &["ru", "russian", "rf", "🇷🇺"]),
    ("UA", &["ua", "ukrainian", "🇺🇦"]),
    ("CN", &["cn", "chinese", "🇨🇳"]),
    ("DE", &["german", "🇩🇪"]),
    ("FR", &["french", "🇫🇷"]),
    ("ES", &["spanish", "🇪🇸"]),
    ("IT", &["italian", "🇮🇹"]),
    ("AU", &["aussie", "🇦🇺"]),
    ("CA", &["canadian", "🇨🇦"]),
    ("BR", &["br", "brazilian", "🇧🇷"]),
    ("MX", &["mx", "mexican", "🇲🇽"]),
];

#[derive(Debug, Clone)]
pub struct SectorAlias {
    pub alias: String,
    pub sector: String,
}

#[derive(Debug, Clone)]
pub struct AccessPattern {
    pub access: String,
    pub regex: Regex,
}

#[derive(Debug, Clone)]
pub struct CountryTerms {
    pub code: String,
    /// Lowercased.
    pub terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Dictionaries {
    pub sectors: Vec<SectorAlias>,
    pub access_patterns: Vec<AccessPattern>,
    pub country_keywords: Vec<CountryTerms>,
    pub country_aliases: Vec<CountryTerms>,
}

static BUILTIN: LazyLock<Dictionaries> = LazyLock::new(|| Dictionaries {
    sectors: SECTOR_ALIASES
        .iter()
        .map(|(alias, sector)| sector_alias(alias, sector))
        .collect(),
    access_patterns: ACCESS_PATTERNS
        .iter()
        .map(|(access, pattern)| {
            let regex = compile_access(pattern).expect("built-in access pattern compiles");
            AccessPattern {
                access: access.to_string(),
                regex,
            }
        })
        .collect(),
    country_keywords: builtin_terms(COUNTRY_KEYWORDS),
    country_aliases: builtin_terms(COUNTRY_ALIASES),
});

fn builtin_terms(table: &[(&str, &[&str])]) -> Vec<CountryTerms> {
    table
        .iter()
        .map(|(code, terms)| CountryTerms {
            code: code.to_string(),
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
        })
        .collect()
}

fn sector_alias(alias: &str, sector: &str) -> SectorAlias {
    SectorAlias {
        alias: collapse_whitespace(&alias.to_lowercase()),
        sector: collapse_whitespace(&sector.to_lowercase()),
    }
}

fn compile_access(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// On-disk shape of a dictionary file. Absent tables keep the built-in ones.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DictionaryFile {
    pub sectors: Option<Vec<SectorEntry>>,
    pub access_patterns: Option<Vec<AccessEntry>>,
    pub country_keywords: Option<Vec<CountryEntry>>,
    pub country_aliases: Option<Vec<CountryEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct SectorEntry {
    pub alias: String,
    pub sector: String,
}

#[derive(Debug, Deserialize)]
pub struct AccessEntry {
    pub access: String,
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct CountryEntry {
    pub code: String,
    pub terms: Vec<String>,
}

impl Dictionaries {
    pub fn builtin() -> &'static Dictionaries {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self, DictionaryError> {
        let file: DictionaryFile = serde_json::from_str(json)?;
        Self::from_table_file(file)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let dict = Self::from_json(&content)?;
        info!(
            "Loaded dictionary {}: {} sector aliases, {} access patterns, {} keyword / {} alias countries",
            path.display(),
            dict.sectors.len(),
            dict.access_patterns.len(),
            dict.country_keywords.len(),
            dict.country_aliases.len()
        );
        Ok(dict)
    }

    fn from_table_file(file: DictionaryFile) -> Result<Self, DictionaryError> {
        let mut dict = Self::builtin().clone();

        if let Some(sectors) = file.sectors {
            dict.sectors = sectors
                .iter()
                .map(|e| sector_alias(&e.alias, &e.sector))
                .filter(|e| !e.alias.is_empty())
                .collect();
        }

        if let Some(patterns) = file.access_patterns {
            dict.access_patterns = patterns
                .into_iter()
                .map(|e| -> Result<AccessPattern, DictionaryError> {
                    let regex = compile_access(&e.pattern).map_err(|source| {
                        DictionaryError::InvalidPattern {
                            access: e.access.clone(),
                            source,
                        }
                    })?;
                    Ok(AccessPattern {
                        access: e.access.trim().to_lowercase(),
                        regex,
                    })
                })
                .collect::<Result<_, DictionaryError>>()?;
        }

        if let Some(entries) = file.country_keywords {
            dict.country_keywords = country_terms(entries)?;
        }
        if let Some(entries) = file.country_aliases {
            dict.country_aliases = country_terms(entries)?;
        }

        Ok(dict)
    }

    /// Canonical sector for an exact alias.
    pub fn sector_for(&self, alias: &str) -> Option<&str> {
        self.sectors
            .iter()
            .find(|e| e.alias == alias)
            .map(|e| e.sector.as_str())
    }
}

fn country_terms(entries: Vec<CountryEntry>) -> Result<Vec<CountryTerms>, DictionaryError> {
    entries
        .into_iter()
        .map(|e| {
            let code = e.code.trim().to_uppercase();
            if !is_iso_country(&code) {
                return Err(DictionaryError::UnknownCountry(e.code));
            }
            let terms = e
                .terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            Ok(CountryTerms { code, terms })
        })
        .collect()
}
