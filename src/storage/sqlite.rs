use crate::dictionary::Dictionaries;
use crate::model::{Broker, Listing, NewListing, StorageError};
use crate::normalizer::{normalize_broker_name, normalize_sector};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{info, warn};

const LISTING_COLUMNS: &str = "l.id, l.broker_id, l.access_type, l.country, l.privilege, l.price,
     l.description, l.source, l.post_date, l.sector, l.revenue,
     l.raw_title, l.raw_text, l.raw_url, l.created_at";

pub struct SqliteStorage {
    conn: Connection,
    dict: Dictionaries,
}

impl SqliteStorage {
    /// Opens the database file and brings the schema up to date.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path.as_ref())?;
        info!("Opened database {}", db_path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Dictionaries used to canonicalize sectors on write and lookup.
    pub fn with_dictionaries(mut self, dict: Dictionaries) -> Self {
        self.dict = dict;
        self
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS brokers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                raw_name TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                broker_id INTEGER NOT NULL,
                access_type TEXT NOT NULL DEFAULT '',
                country TEXT NOT NULL DEFAULT '',
                privilege TEXT NOT NULL DEFAULT '',
                price TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                post_date TEXT NOT NULL DEFAULT '',
                sector TEXT NOT NULL DEFAULT '',
                revenue TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY (broker_id) REFERENCES brokers(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_brokers_name ON brokers(name);
            CREATE INDEX IF NOT EXISTS idx_listings_broker ON listings(broker_id);
            ",
        )?;

        // Raw post capture arrived after the first schema.
        Self::migrate_add_column_if_missing(&conn, "listings", "raw_title", "TEXT")?;
        Self::migrate_add_column_if_missing(&conn, "listings", "raw_text", "TEXT")?;
        Self::migrate_add_column_if_missing(&conn, "listings", "raw_url", "TEXT")?;

        Ok(Self {
            conn,
            dict: Dictionaries::builtin().clone(),
        })
    }

    /// Adds a column to the table if an older database lacks it.
    fn migrate_add_column_if_missing(
        conn: &Connection,
        table: &str,
        column: &str,
        column_def: &str,
    ) -> Result<(), StorageError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let existing_columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;

        if !existing_columns.iter().any(|c| c == column) {
            let alter_sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def);
            conn.execute(&alter_sql, [])?;
            info!("Migrated {}: added column {}", table, column);
        }

        Ok(())
    }

    /// Creates a broker keyed by its normalized name. A broker with the same
    /// normalized name may already exist; the flag reports it.
    pub fn create_broker(&self, raw_name: &str, notes: &str) -> Result<(Broker, bool), StorageError> {
        let name = normalize_broker_name(raw_name);
        if name.is_empty() {
            return Err(StorageError::EmptyBrokerName(raw_name.to_string()));
        }

        let duplicate = !self.find_brokers_by_name(&name)?.is_empty();
        if duplicate {
            warn!("Broker '{}' already exists, creating another entry", name);
        }

        self.conn.execute(
            "INSERT INTO brokers (name, raw_name, notes, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, raw_name.trim(), notes, Utc::now().to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        let broker = self
            .get_broker(id)?
            .ok_or_else(|| StorageError::NotFound(format!("broker {}", id)))?;
        Ok((broker, duplicate))
    }

    pub fn get_broker(&self, id: i64) -> Result<Option<Broker>, StorageError> {
        let broker = self
            .conn
            .query_row(
                "SELECT id, name, raw_name, notes, created_at FROM brokers WHERE id = ?1",
                params![id],
                Self::map_broker,
            )
            .optional()?;
        Ok(broker)
    }

    /// Brokers whose normalized name equals the normalized form of `name`.
    pub fn find_brokers_by_name(&self, name: &str) -> Result<Vec<Broker>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, raw_name, notes, created_at FROM brokers WHERE name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![normalize_broker_name(name)], Self::map_broker)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn list_brokers(&self) -> Result<Vec<Broker>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, raw_name, notes, created_at FROM brokers ORDER BY name, id")?;
        let rows = stmt.query_map([], Self::map_broker)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Notes are the only broker field that can change after creation.
    pub fn update_broker_notes(&self, id: i64, notes: &str) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute("UPDATE brokers SET notes = ?1 WHERE id = ?2", params![notes, id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("broker {}", id)));
        }
        Ok(())
    }

    /// Deletes the broker together with its listings.
    pub fn delete_broker(&self, id: i64) -> Result<(), StorageError> {
        let changed = self.conn.execute("DELETE FROM brokers WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("broker {}", id)));
        }
        info!("Deleted broker {}", id);
        Ok(())
    }

    fn prepare_listing(&self, listing: &NewListing) -> Result<NewListing, StorageError> {
        let listing = listing.canonicalized(&self.dict);
        listing.validate()?;
        if self.get_broker(listing.broker_id)?.is_none() {
            return Err(StorageError::NotFound(format!("broker {}", listing.broker_id)));
        }
        Ok(listing)
    }

    /// Canonicalizes and stores a listing. Duplicates are not rejected here;
    /// callers check `find_duplicates` first.
    pub fn insert_listing(&self, listing: &NewListing) -> Result<Listing, StorageError> {
        let l = self.prepare_listing(listing)?;
        self.conn.execute(
            "INSERT INTO listings (
                broker_id, access_type, country, privilege, price, description, source,
                post_date, sector, revenue, raw_title, raw_text, raw_url, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                l.broker_id,
                l.access_type,
                l.country,
                l.privilege,
                l.price,
                l.description,
                l.source,
                l.post_date,
                l.sector,
                l.revenue,
                l.raw_title,
                l.raw_text,
                l.raw_url,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Saved listing {} for broker {}", id, l.broker_id);
        self.get_listing(id)?
            .ok_or_else(|| StorageError::NotFound(format!("listing {}", id)))
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<Listing>, StorageError> {
        let sql = format!("SELECT {} FROM listings l WHERE l.id = ?1", LISTING_COLUMNS);
        let listing = self
            .conn
            .query_row(&sql, params![id], Self::map_listing)
            .optional()?;
        Ok(listing)
    }

    pub fn listings_for_broker(&self, broker_id: i64) -> Result<Vec<Listing>, StorageError> {
        let sql = format!(
            "SELECT {} FROM listings l WHERE l.broker_id = ?1 ORDER BY l.id",
            LISTING_COLUMNS
        );
        self.query_listings(&sql, params![broker_id])
    }

    /// Listings whose stored sector equals the canonical form of `sector`.
    pub fn find_by_sector(&self, sector: &str) -> Result<Vec<Listing>, StorageError> {
        let sql = format!(
            "SELECT {} FROM listings l WHERE l.sector = ?1 ORDER BY l.id",
            LISTING_COLUMNS
        );
        self.query_listings(&sql, params![normalize_sector(sector, &self.dict)])
    }

    /// Case-insensitive substring search over broker name and the main
    /// listing fields.
    pub fn search(&self, query: &str) -> Result<Vec<Listing>, StorageError> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let sql = format!(
            "SELECT {} FROM listings l JOIN brokers b ON b.id = l.broker_id
             WHERE LOWER(b.name) LIKE ?1
                OR LOWER(l.sector) LIKE ?1
                OR LOWER(l.revenue) LIKE ?1
                OR LOWER(l.country) LIKE ?1
                OR LOWER(l.access_type) LIKE ?1
                OR LOWER(l.description) LIKE ?1
             ORDER BY l.id",
            LISTING_COLUMNS
        );
        self.query_listings(&sql, params![pattern])
    }

    /// Replaces every field of an existing listing.
    pub fn update_listing(&self, id: i64, listing: &NewListing) -> Result<Listing, StorageError> {
        let l = self.prepare_listing(listing)?;
        let changed = self.conn.execute(
            "UPDATE listings SET
                broker_id = ?1, access_type = ?2, country = ?3, privilege = ?4, price = ?5,
                description = ?6, source = ?7, post_date = ?8, sector = ?9, revenue = ?10,
                raw_title = ?11, raw_text = ?12, raw_url = ?13
             WHERE id = ?14",
            params![
                l.broker_id,
                l.access_type,
                l.country,
                l.privilege,
                l.price,
                l.description,
                l.source,
                l.post_date,
                l.sector,
                l.revenue,
                l.raw_title,
                l.raw_text,
                l.raw_url,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("listing {}", id)));
        }
        self.get_listing(id)?
            .ok_or_else(|| StorageError::NotFound(format!("listing {}", id)))
    }

    pub fn delete_listing(&self, id: i64) -> Result<(), StorageError> {
        let changed = self.conn.execute("DELETE FROM listings WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("listing {}", id)));
        }
        Ok(())
    }

    /// Stored listings equal to `listing` on every duplicate-key field after
    /// canonicalization. The broker is compared by normalized name, so
    /// listings under a repeated broker entry are found too.
    pub fn find_duplicates(&self, listing: &NewListing) -> Result<Vec<Listing>, StorageError> {
        let l = listing.canonicalized(&self.dict);
        let sql = format!(
            "SELECT {} FROM listings l JOIN brokers b ON b.id = l.broker_id
             WHERE b.name = (SELECT name FROM brokers WHERE id = ?1)
               AND l.access_type = ?2 AND l.country = ?3 AND l.price = ?4
               AND l.source = ?5 AND l.post_date = ?6 AND l.sector = ?7
               AND l.revenue = ?8 AND l.description = ?9
             ORDER BY l.id",
            LISTING_COLUMNS
        );
        self.query_listings(
            &sql,
            params![
                l.broker_id,
                l.access_type,
                l.country,
                l.price,
                l.source,
                l.post_date,
                l.sector,
                l.revenue,
                l.description,
            ],
        )
    }

    fn query_listings(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Listing>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_listing)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn map_broker(row: &Row) -> Result<Broker, rusqlite::Error> {
        Ok(Broker {
            id: row.get(0)?,
            name: row.get(1)?,
            raw_name: row.get(2)?,
            notes: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn map_listing(row: &Row) -> Result<Listing, rusqlite::Error> {
        Ok(Listing {
            id: row.get(0)?,
            broker_id: row.get(1)?,
            access_type: row.get(2)?,
            country: row.get(3)?,
            privilege: row.get(4)?,
            price: row.get(5)?,
            description: row.get(6)?,
            source: row.get(7)?,
            post_date: row.get(8)?,
            sector: row.get(9)?,
            revenue: row.get(10)?,
            raw_title: row.get(11)?,
            raw_text: row.get(12)?,
            raw_url: row.get(13)?,
            created_at: row.get(14)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqliteStorage {
        SqliteStorage::open_in_memory().expect("in-memory storage")
    }

    fn listing(broker_id: i64) -> NewListing {
        NewListing {
            broker_id,
            access_type: "rdp".into(),
            country: "US".into(),
            privilege: "domain admin".into(),
            price: "START 700, STEP 200".into(),
            description: "Hospital | RDP".into(),
            source: "exploit".into(),
            post_date: "2024-03-01".into(),
            sector: "hospital".into(),
            revenue: "10 to 25 million".into(),
            ..NewListing::default()
        }
    }

    #[test]
    fn broker_names_are_normalized_and_duplicates_flagged() {
        let db = storage();
        let (first, dup) = db.create_broker("  Shadow   Broker!! ", "seen on xss").unwrap();
        assert_eq!(first.name, "shadow broker");
        assert_eq!(first.raw_name, "Shadow   Broker!!");
        assert!(!dup);

        let (second, dup) = db.create_broker("SHADOW broker", "").unwrap();
        assert!(dup);
        assert_ne!(first.id, second.id);
        assert_eq!(db.find_brokers_by_name("shadow BROKER").unwrap().len(), 2);
    }

    #[test]
    fn empty_broker_name_is_rejected() {
        let db = storage();
        assert!(matches!(
            db.create_broker(" !! ", ""),
            Err(StorageError::EmptyBrokerName(_))
        ));
    }

    #[test]
    fn broker_notes_can_change() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        db.update_broker_notes(b.id, "active since 2023").unwrap();
        assert_eq!(db.get_broker(b.id).unwrap().unwrap().notes, "active since 2023");
        assert!(matches!(
            db.update_broker_notes(999, "x"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn insert_canonicalizes_fields() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let mut raw = listing(b.id);
        raw.country = "us".into();
        raw.privilege = "User, domain admin, user".into();
        let saved = db.insert_listing(&raw).unwrap();

        assert_eq!(saved.country, "US");
        assert_eq!(saved.privilege, "user, domain admin");
        assert_eq!(saved.sector, "healthcare");
        assert_eq!(saved.revenue, "10-25M");
        assert_eq!(saved.raw_url, None);
    }

    #[test]
    fn insert_enforces_invariants() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();

        let mut bad_date = listing(b.id);
        bad_date.post_date = "31.02.2024".into();
        assert!(matches!(
            db.insert_listing(&bad_date),
            Err(StorageError::InvalidPostDate(_))
        ));

        let mut bad_country = listing(b.id);
        bad_country.country = "Germany".into();
        assert!(matches!(
            db.insert_listing(&bad_country),
            Err(StorageError::InvalidCountry(_))
        ));

        assert!(matches!(
            db.insert_listing(&listing(b.id + 100)),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn duplicates_ignore_privilege_but_not_key_fields() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let stored = db.insert_listing(&listing(b.id)).unwrap();

        let mut other_privilege = listing(b.id);
        other_privilege.privilege = "user".into();
        let dupes = db.find_duplicates(&other_privilege).unwrap();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].id, stored.id);

        let mut other_price = listing(b.id);
        other_price.price = "START 800".into();
        assert!(db.find_duplicates(&other_price).unwrap().is_empty());

        let mut other_case = listing(b.id);
        other_case.description = "hospital | rdp".into();
        assert!(db.find_duplicates(&other_case).unwrap().is_empty());
    }

    #[test]
    fn duplicates_span_repeated_broker_entries() {
        let db = storage();
        let (first, _) = db.create_broker("Alpha", "").unwrap();
        let (second, _) = db.create_broker("alpha ", "").unwrap();
        let (other, _) = db.create_broker("beta", "").unwrap();
        db.insert_listing(&listing(first.id)).unwrap();

        assert_eq!(db.find_duplicates(&listing(second.id)).unwrap().len(), 1);
        assert!(db.find_duplicates(&listing(other.id)).unwrap().is_empty());
    }

    #[test]
    fn update_replaces_all_fields() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let saved = db.insert_listing(&listing(b.id)).unwrap();

        let mut changed = NewListing::from(&saved);
        changed.price = "BLITZ 5000".into();
        changed.raw_url = Some("http://forum.example/t/1".into());
        let updated = db.update_listing(saved.id, &changed).unwrap();

        assert_eq!(updated.price, "BLITZ 5000");
        assert_eq!(updated.raw_url.as_deref(), Some("http://forum.example/t/1"));
        assert_eq!(updated.created_at, saved.created_at);
        assert!(matches!(
            db.update_listing(999, &changed),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn deleting_broker_cascades_to_listings() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let l = db.insert_listing(&listing(b.id)).unwrap();

        db.delete_broker(b.id).unwrap();
        assert!(db.get_listing(l.id).unwrap().is_none());
        assert!(db.listings_for_broker(b.id).unwrap().is_empty());
    }

    #[test]
    fn listing_can_be_deleted_alone() {
        let db = storage();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let l = db.insert_listing(&listing(b.id)).unwrap();
        db.delete_listing(l.id).unwrap();
        assert!(db.get_broker(b.id).unwrap().is_some());
        assert!(matches!(db.delete_listing(l.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn sector_lookup_and_search() {
        let db = storage();
        let (b, _) = db.create_broker("Gamma Access", "").unwrap();
        db.insert_listing(&listing(b.id)).unwrap();

        assert_eq!(db.find_by_sector("Clinic").unwrap().len(), 1);
        assert!(db.find_by_sector("retail").unwrap().is_empty());
        assert_eq!(db.search("GAMMA").unwrap().len(), 1);
        assert_eq!(db.search("10-25m").unwrap().len(), 1);
        assert!(db.search("nothing like it").unwrap().is_empty());
    }

    #[test]
    fn old_database_gains_raw_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axis.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE listings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    broker_id INTEGER NOT NULL,
                    access_type TEXT NOT NULL DEFAULT '',
                    country TEXT NOT NULL DEFAULT '',
                    privilege TEXT NOT NULL DEFAULT '',
                    price TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    source TEXT NOT NULL DEFAULT '',
                    post_date TEXT NOT NULL DEFAULT '',
                    sector TEXT NOT NULL DEFAULT '',
                    revenue TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL
                );",
            )
            .unwrap();
        }

        let db = SqliteStorage::new(&path).unwrap();
        let (b, _) = db.create_broker("alpha", "").unwrap();
        let mut raw = listing(b.id);
        raw.raw_title = Some("[US] hospital RDP".into());
        let saved = db.insert_listing(&raw).unwrap();
        assert_eq!(saved.raw_title.as_deref(), Some("[US] hospital RDP"));
    }
}
