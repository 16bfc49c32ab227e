pub mod config;
pub mod dictionary;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod storage;
pub mod utils;

pub use model::{Broker, DuplicateKey, Listing, ListingSuggestion, NewListing};
pub use parser::{Parser, PostParser, suggest_listing_fields};
