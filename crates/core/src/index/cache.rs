//! Persistent identifier cache: maps a catalog item's native reference
//! string to its resolved identifier list, partitioned by section.
//!
//! An entry is only served while its stored timestamp is at least the
//! item's current last-modified timestamp. An unreadable store is treated
//! as empty: it is reset and rebuilt over the following runs.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::CacheError;

/// A cached identifier resolution for one catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The item's external reference strings, one per namespace.
    pub identifiers: Vec<String>,
    /// The item's last-modified timestamp at resolution time (unix secs).
    pub updated_at: i64,
}

/// SQLite-backed identifier cache.
pub struct IdentifierCache {
    conn: Mutex<Connection>,
}

impl IdentifierCache {
    /// Open (or create) the cache at `path`. An unreadable store is
    /// deleted and recreated empty.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        match Self::try_open(path) {
            Ok(cache) => Ok(cache),
            Err(first_err) => {
                warn!(
                    "Identifier cache at {} is unreadable ({}); resetting it",
                    path.display(),
                    first_err
                );
                std::fs::remove_file(path)
                    .map_err(|e| CacheError::Database(format!("failed to reset cache: {}", e)))?;
                Self::try_open(path)
            }
        }
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn try_open(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS identifier_cache (
                section_id TEXT NOT NULL,
                guid TEXT NOT NULL,
                identifiers TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (section_id, guid)
            );
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch an entry. A malformed row reads as a miss so it gets
    /// re-resolved and overwritten.
    pub fn get(&self, section_id: &str, guid: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT identifiers, updated_at FROM identifier_cache
                 WHERE section_id = ?1 AND guid = ?2",
                params![section_id, guid],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let Some((identifiers_json, updated_at)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&identifiers_json) {
            Ok(identifiers) => Ok(Some(CacheEntry {
                identifiers,
                updated_at,
            })),
            Err(e) => {
                warn!("Malformed identifier cache entry for '{}': {}", guid, e);
                Ok(None)
            }
        }
    }

    /// Insert or overwrite an entry.
    pub fn put(
        &self,
        section_id: &str,
        guid: &str,
        entry: &CacheEntry,
    ) -> Result<(), CacheError> {
        let identifiers_json = serde_json::to_string(&entry.identifiers)
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO identifier_cache
             (section_id, guid, identifiers, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![section_id, guid, identifiers_json, entry.updated_at],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    /// Drop every entry.
    pub fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute("DELETE FROM identifier_cache", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }
}
