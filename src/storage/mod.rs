// Persistence for brokers and listings.
pub mod sqlite;

pub use sqlite::SqliteStorage;
