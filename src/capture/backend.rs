//! Key-value storage backends
//!
//! The collection lives under a single namespaced key. Backends only need to
//! read a whole value and replace a whole value; nothing here offers appends
//! or compare-and-swap, so callers must serialize their own writes.
//!
//! [`SqliteBackend`] uses the same `ItemTable(key, value)` layout as the
//! editor `state.vscdb` files, with values stored as JSON text.

use rusqlite::{types::ValueRef, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("stored value for `{key}` is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A namespaced key-value store holding JSON values
pub trait KvBackend: Send + 'static {
    /// Read the value under `key`, or `None` when absent
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value under `key` entirely
    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Read the value under `key`, falling back to `default` when absent
    fn get_or(&self, key: &str, default: Value) -> Result<Value, StorageError> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// SQLite-backed store using a single `ItemTable`
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Open (or create) a store database for reading and writing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an existing store database without write access
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB)",
        )?;
        Ok(Self { conn, path })
    }

    /// Path of the database file, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy the database into a standalone file (used for backups)
    pub fn snapshot_to<P: AsRef<Path>>(&self, dest: P) -> Result<(), StorageError> {
        let dest = dest.as_ref().to_string_lossy().to_string();
        self.conn.execute("VACUUM INTO ?1", [dest])?;
        Ok(())
    }
}

impl KvBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        // Editors write either TEXT or BLOB into the value column; a NULL
        // value counts as absent, any other column type is not JSON at all
        let row = self
            .conn
            .query_row(
                "SELECT value FROM ItemTable WHERE key = ?1",
                [key],
                |row| {
                    Ok(match row.get_ref(0)? {
                        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(Some(bytes.to_vec())),
                        ValueRef::Null => Ok(None),
                        other => Err(other.data_type()),
                    })
                },
            )
            .optional()?;

        let raw = match row {
            None | Some(Ok(None)) => return Ok(None),
            Some(Ok(Some(raw))) => raw,
            Some(Err(column_type)) => {
                return Err(StorageError::Corrupt {
                    key: key.to_string(),
                    reason: format!("expected JSON text, found {} column", column_type),
                })
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO ItemTable (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, text],
        )?;
        Ok(())
    }
}

/// Shared in-memory store
///
/// Clones share the same map, so a test can hand one clone to the writer and
/// inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: Arc<Mutex<HashMap<String, Value>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StorageError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory backend offline".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, StorageError> {
        self.items
            .lock()
            .map_err(|_| StorageError::Unavailable("memory backend poisoned".into()))
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check()?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), StorageError> {
        self.check()?;
        self.lock()?.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_sqlite_get_absent_key() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.get("fluxCollections").unwrap(), None);
        assert_eq!(
            backend.get_or("fluxCollections", json!([])).unwrap(),
            json!([])
        );
    }

    #[test]
    fn test_sqlite_set_replaces_value() {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        backend.set("k", &json!([1])).unwrap();
        backend.set("k", &json!([1, 2])).unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(json!([1, 2])));

        let rows: i64 = backend
            .conn
            .query_row("SELECT COUNT(*) FROM ItemTable", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.sqlite");

        {
            let mut backend = SqliteBackend::open(&path).unwrap();
            backend.set("fluxCollections", &json!([{"url": "a.com"}])).unwrap();
        }

        let backend = SqliteBackend::open_read_only(&path).unwrap();
        assert_eq!(
            backend.get("fluxCollections").unwrap(),
            Some(json!([{"url": "a.com"}]))
        );
        assert_eq!(backend.path(), Some(path.as_path()));
    }

    #[test]
    fn test_sqlite_reads_blob_values() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute(
                "INSERT INTO ItemTable (key, value) VALUES ('k', ?1)",
                [b"[\"x\"]".to_vec()],
            )
            .unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(json!(["x"])));
    }

    #[test]
    fn test_sqlite_corrupt_value() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute("INSERT INTO ItemTable (key, value) VALUES ('k', 'not json')", [])
            .unwrap();
        assert!(matches!(
            backend.get("k"),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_sqlite_numeric_value_is_corrupt() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute_batch(
                "INSERT INTO ItemTable (key, value) VALUES ('int', 42);
                 INSERT INTO ItemTable (key, value) VALUES ('real', 1.5);",
            )
            .unwrap();
        assert!(matches!(
            backend.get("int"),
            Err(StorageError::Corrupt { .. })
        ));
        assert!(matches!(
            backend.get("real"),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_sqlite_null_value_is_absent() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute("INSERT INTO ItemTable (key, value) VALUES ('k', NULL)", [])
            .unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_append_leaves_numeric_value_in_place() {
        use crate::capture::collection::CollectionStore;

        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute("INSERT INTO ItemTable (key, value) VALUES ('k', 42)", [])
            .unwrap();

        let mut store = CollectionStore::new(backend, "k");
        assert!(matches!(
            store.append(json!("x")),
            Err(StorageError::Corrupt { .. })
        ));

        let value: i64 = store
            .backend()
            .conn
            .query_row("SELECT value FROM ItemTable WHERE key = 'k'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_sqlite_snapshot() {
        let dir = tempdir().unwrap();
        let mut backend = SqliteBackend::open(dir.path().join("state.sqlite")).unwrap();
        backend.set("k", &json!([1, 2, 3])).unwrap();

        let snapshot = dir.path().join("snapshot.sqlite");
        backend.snapshot_to(&snapshot).unwrap();

        let copy = SqliteBackend::open_read_only(&snapshot).unwrap();
        assert_eq!(copy.get("k").unwrap(), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_memory_clones_share_state() {
        let mut writer = MemoryBackend::new();
        let reader = writer.clone();
        writer.set("k", &json!("v")).unwrap();
        assert_eq!(reader.get("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn test_memory_unavailable() {
        let mut backend = MemoryBackend::new();
        backend.set_unavailable(true);
        assert!(matches!(
            backend.set("k", &json!(1)),
            Err(StorageError::Unavailable(_))
        ));
        assert!(backend.get("k").is_err());

        backend.set_unavailable(false);
        backend.set("k", &json!(1)).unwrap();
        assert_eq!(backend.get("k").unwrap(), Some(json!(1)));
    }
}
