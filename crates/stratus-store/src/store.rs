//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

use stratus_types::QueueMethod;

use crate::error::{Error, Result};
use crate::models::{AddOutcome, CacheStats, CachedSnapshot, QueuedAction, StoredFavorite};
use crate::schema;

/// SQLite-based store for the offline sync collections.
///
/// Every operation is a single SQL statement (or a well-defined sweep over
/// one table), so each call is individually atomic; no reader observes a
/// half-written record.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        // Initialize schema
        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite()
        || !longitude.is_finite()
        || latitude.abs() > 90.0
        || longitude.abs() > 180.0
    {
        return Err(Error::InvalidCoordinates {
            latitude,
            longitude,
        });
    }
    Ok(())
}

// Weather cache operations
impl Store {
    /// Store a weather snapshot, replacing any existing snapshot for the
    /// same location key.
    pub fn put_snapshot(&self, snapshot: &CachedSnapshot) -> Result<()> {
        validate_coordinates(snapshot.latitude, snapshot.longitude)?;
        let payload = serde_json::to_string(&snapshot.payload)?;

        self.conn.execute(
            "INSERT INTO weather_cache (location_key, latitude, longitude, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(location_key) DO UPDATE SET
                latitude = ?2,
                longitude = ?3,
                payload = ?4,
                fetched_at = ?5",
            rusqlite::params![
                snapshot.location_key,
                snapshot.latitude,
                snapshot.longitude,
                payload,
                snapshot.fetched_at.unix_timestamp(),
            ],
        )?;

        debug!("Stored snapshot for {}", snapshot.location_key);
        Ok(())
    }

    /// Get the cached snapshot for a location key, if any.
    pub fn get_snapshot(&self, location_key: &str) -> Result<Option<CachedSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT location_key, latitude, longitude, payload, fetched_at
             FROM weather_cache WHERE location_key = ?",
        )?;

        let row = stmt
            .query_row([location_key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .optional()?;

        match row {
            Some((location_key, latitude, longitude, payload, fetched_at)) => {
                Ok(Some(CachedSnapshot {
                    location_key,
                    latitude,
                    longitude,
                    payload: serde_json::from_str(&payload)?,
                    fetched_at: OffsetDateTime::from_unix_timestamp(fetched_at).unwrap(),
                }))
            }
            None => Ok(None),
        }
    }

    /// Delete snapshots older than `max_age`. Returns the number removed.
    pub fn sweep_expired_snapshots(&self, max_age: Duration) -> Result<usize> {
        let cutoff = (OffsetDateTime::now_utc() - max_age).unix_timestamp();
        let removed = self.conn.execute(
            "DELETE FROM weather_cache WHERE fetched_at < ?",
            [cutoff],
        )?;

        if removed > 0 {
            info!("Swept {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Summary statistics over the weather cache.
    pub fn cache_stats(&self) -> Result<CacheStats> {
        let (entries, oldest, newest): (i64, Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), MIN(fetched_at), MAX(fetched_at) FROM weather_cache",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(CacheStats {
            entries: entries as u64,
            oldest_fetched_at: oldest.map(|ts| OffsetDateTime::from_unix_timestamp(ts).unwrap()),
            newest_fetched_at: newest.map(|ts| OffsetDateTime::from_unix_timestamp(ts).unwrap()),
        })
    }
}

// Favorite operations
impl Store {
    /// Pin a favorite location.
    ///
    /// Uniqueness is exact `(latitude, longitude)` equality; a duplicate
    /// insert is a no-op that returns [`AddOutcome::Duplicate`] rather than
    /// an error.
    pub fn add_favorite(&self, latitude: f64, longitude: f64, label: &str) -> Result<AddOutcome> {
        validate_coordinates(latitude, longitude)?;
        if label.trim().is_empty() {
            return Err(Error::EmptyLabel);
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO favorites (latitude, longitude, label, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![latitude, longitude, label, now],
        )?;

        if inserted == 0 {
            debug!("Favorite ({}, {}) already exists", latitude, longitude);
            Ok(AddOutcome::Duplicate)
        } else {
            Ok(AddOutcome::Added(self.conn.last_insert_rowid()))
        }
    }

    /// List all favorites in insertion order.
    pub fn list_favorites(&self) -> Result<Vec<StoredFavorite>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, latitude, longitude, label, created_at
             FROM favorites ORDER BY id",
        )?;

        let favorites = stmt
            .query_map([], |row| {
                Ok(StoredFavorite {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    label: row.get(3)?,
                    created_at: OffsetDateTime::from_unix_timestamp(row.get(4)?).unwrap(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(favorites)
    }

    /// Remove a favorite by ID. Removing a non-existent ID is a no-op.
    pub fn remove_favorite(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM favorites WHERE id = ?", [id])?;
        Ok(())
    }

    /// Count stored favorites.
    pub fn count_favorites(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// Settings operations
impl Store {
    /// Store a named preference value. Last write wins.
    pub fn set_setting<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, encoded],
        )?;

        debug!("Setting stored: {}", key);
        Ok(())
    }

    /// Get a named preference value, if set.
    pub fn get_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let encoded: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match encoded {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }
}

// Sync queue operations
impl Store {
    /// Append a pending mutation to a queue. Returns the assigned ID.
    pub fn enqueue(
        &self,
        queue_name: &str,
        method: QueueMethod,
        data: &serde_json::Value,
    ) -> Result<i64> {
        let encoded = serde_json::to_string(data)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();

        self.conn.execute(
            "INSERT INTO sync_queue (queue_name, method, data, enqueued_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![queue_name, method.as_str(), encoded, now],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Queued {} action {} on '{}'", method, id, queue_name);
        Ok(id)
    }

    /// List pending actions for a queue, oldest first.
    pub fn list_queued(&self, queue_name: &str) -> Result<Vec<QueuedAction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, queue_name, method, data, enqueued_at
             FROM sync_queue WHERE queue_name = ?
             ORDER BY enqueued_at ASC, id ASC",
        )?;

        let rows = stmt
            .query_map([queue_name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, queue_name, method, data, enqueued_at)| {
                Ok(QueuedAction {
                    id,
                    queue_name,
                    method: method.parse()?,
                    data: serde_json::from_str(&data)?,
                    enqueued_at: OffsetDateTime::from_unix_timestamp(enqueued_at).unwrap(),
                })
            })
            .collect()
    }

    /// Remove a queued action by ID. Removing a non-existent ID is a no-op.
    pub fn dequeue(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", [id])?;
        Ok(())
    }

    /// Count pending actions for a queue.
    pub fn count_queued(&self, queue_name: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE queue_name = ?",
            [queue_name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Drop every pending action for a queue. Returns the number removed.
    ///
    /// Queued actions never expire on their own; this is the only way an
    /// unreplayable action leaves the queue.
    pub fn purge_queue(&self, queue_name: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM sync_queue WHERE queue_name = ?", [queue_name])?;

        if removed > 0 {
            info!("Purged {} actions from '{}'", removed, queue_name);
        }
        Ok(removed)
    }
}
