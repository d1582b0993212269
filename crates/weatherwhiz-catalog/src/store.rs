//! SQLite-backed location catalog.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;
use tokio::sync::watch;
use weatherwhiz_core::{DatabaseError, RusqliteErrorExt};

use crate::location::{Location, LocationId};

const BUILTIN_CITIES: &str = include_str!("../data/cities.json");

/// Errors raised by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Invalid location: {0}")]
    Invalid(String),
}

impl CatalogError {
    pub fn user_message(&self) -> &'static str {
        match self {
            CatalogError::Database(e) => e.user_message(),
            CatalogError::Invalid(_) => "That location is not valid. Check the name and coordinates.",
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        CatalogError::Database(err.into_database_error())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Local SQLite storage for quiz locations.
///
/// The connection sits behind a mutex so the store can be shared across
/// tasks. Every mutation republishes the full listing (ordered by name) to
/// `subscribe()` receivers.
pub struct LocationStore {
    conn: Mutex<Connection>,
    listing: watch::Sender<Vec<Location>>,
}

impl LocationStore {
    /// Open or create the catalog database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory catalog.
    pub fn in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> CatalogResult<Self> {
        Self::init_schema(&conn)?;
        let (listing, _) = watch::channel(Vec::new());
        let store = Self {
            conn: Mutex::new(conn),
            listing,
        };
        store.publish()?;
        Ok(store)
    }

    fn init_schema(conn: &Connection) -> CatalogResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                is_user_added INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_locations_name ON locations(name);
            "#,
        )?;
        Ok(())
    }

    fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
        let is_user_added: i32 = row.get(4)?;
        Ok(Location {
            id: row.get(0)?,
            name: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            is_user_added: is_user_added != 0,
        })
    }

    /// Load the bundled city list if the catalog is empty.
    ///
    /// Returns the number of locations inserted.
    pub fn seed_builtin(&self) -> CatalogResult<usize> {
        let seeds: Vec<Location> = serde_json::from_str(BUILTIN_CITIES)
            .map_err(|e| DatabaseError::Seed(e.to_string()))?;
        self.seed(&seeds)
    }

    /// Insert `seeds` as built-in locations if the catalog is empty.
    pub fn seed(&self, seeds: &[Location]) -> CatalogResult<usize> {
        let inserted = {
            let mut conn = self.conn.lock();
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
            if count > 0 {
                tracing::debug!("Catalog already has {} locations, skipping seed", count);
                return Ok(0);
            }

            let tx = conn.transaction()?;
            for seed in seeds {
                tx.execute(
                    "INSERT OR REPLACE INTO locations (id, name, latitude, longitude, is_user_added)
                     VALUES (?1, ?2, ?3, ?4, 0)",
                    params![seed.id, seed.name, seed.latitude, seed.longitude],
                )?;
            }
            tx.commit()?;
            seeds.len()
        };

        tracing::info!("Seeded catalog with {} built-in locations", inserted);
        self.publish()?;
        Ok(inserted)
    }

    /// All locations ordered by name ascending.
    pub fn list(&self) -> CatalogResult<Vec<Location>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, latitude, longitude, is_user_added
             FROM locations ORDER BY name ASC, id ASC",
        )?;
        let locations = stmt
            .query_map([], Self::row_to_location)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(locations)
    }

    /// Observe the listing; the receiver always holds the latest ordered list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Location>> {
        self.listing.subscribe()
    }

    /// Insert a location, replacing any existing row with the same id.
    pub fn insert(&self, location: &Location) -> CatalogResult<()> {
        Self::validate(&location.name, location)?;

        self.conn.lock().execute(
            "INSERT OR REPLACE INTO locations (id, name, latitude, longitude, is_user_added)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                location.id,
                location.name,
                location.latitude,
                location.longitude,
                location.is_user_added as i32,
            ],
        )?;

        self.publish()
    }

    /// Add a user location with a freshly allocated id.
    pub fn add_user_location(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
    ) -> CatalogResult<Location> {
        let name = name.trim();
        let mut location = Location::new(0, name, latitude, longitude).user_added();
        Self::validate(name, &location)?;

        location.id = {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO locations (name, latitude, longitude, is_user_added)
                 VALUES (?1, ?2, ?3, 1)",
                params![location.name, location.latitude, location.longitude],
            )?;
            conn.last_insert_rowid()
        };

        tracing::info!("Added user location {} ({})", location.name, location.id);
        self.publish()?;
        Ok(location)
    }

    /// Delete a user-added location.
    ///
    /// Built-in locations are never removed; returns whether a row was deleted.
    pub fn delete(&self, id: LocationId) -> CatalogResult<bool> {
        let removed = self.conn.lock().execute(
            "DELETE FROM locations WHERE is_user_added = 1 AND id = ?1",
            params![id],
        )?;

        if removed == 0 {
            tracing::debug!("No user-added location with id {}", id);
            return Ok(false);
        }

        self.publish()?;
        Ok(true)
    }

    fn validate(name: &str, location: &Location) -> CatalogResult<()> {
        if name.is_empty() {
            return Err(CatalogError::Invalid("name cannot be empty".into()));
        }
        if !location.has_valid_coordinates() {
            return Err(CatalogError::Invalid(format!(
                "coordinates out of range: {}, {}",
                location.latitude, location.longitude
            )));
        }
        Ok(())
    }

    fn publish(&self) -> CatalogResult<()> {
        let locations = self.list()?;
        self.listing.send_replace(locations);
        Ok(())
    }
}
