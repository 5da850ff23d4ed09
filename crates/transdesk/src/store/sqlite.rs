use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations, RecordStore, StoreError};

/// SQLite-backed store. Cloning shares the connection; access is
/// serialized through the mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and applies pending migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::run_all(&conn)?;

        log::info!("Record store opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

impl RecordStore for SqliteStore {
    fn hset(&self, partition: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO hash_fields (partition, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(partition, field)
                 DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![partition, field, value],
            )?;
            Ok(())
        })
    }

    fn hget(&self, partition: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM hash_fields WHERE partition = ?1 AND field = ?2",
                    params![partition, field],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn hgetall(&self, partition: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT field, value FROM hash_fields WHERE partition = ?1 ORDER BY field",
            )?;
            let rows = stmt
                .query_map(params![partition], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<Result<Vec<(String, String)>, _>>()?;
            Ok(rows)
        })
    }

    fn hexists(&self, partition: &str, field: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM hash_fields WHERE partition = ?1 AND field = ?2)",
                params![partition, field],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }
}
