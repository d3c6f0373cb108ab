use crate::errors::{AppError, AppResult};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const UPSERT_BLOB_SQL: &str = "INSERT INTO blobs (key, value_json, revision, updated_at)
     VALUES (?1, ?2, 1, ?3)
     ON CONFLICT(key) DO UPDATE SET
       value_json = excluded.value_json,
       revision = blobs.revision + 1,
       updated_at = excluded.updated_at";

static BLOB_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$").expect("valid blob key regex"));

/// Key-addressed JSON blob storage. The local SQLite [`Database`] implements
/// it; a remote blob service can sit behind the same trait.
pub trait BlobStore: Send + Sync {
    fn get_blob(&self, key: &str) -> AppResult<Option<serde_json::Value>>;
    fn put_blob(&self, key: &str, value: &serde_json::Value) -> AppResult<()>;
    /// Writes every entry or none of them.
    fn put_blobs(&self, entries: &[(&str, serde_json::Value)]) -> AppResult<()>;
    fn delete_blob(&self, key: &str) -> AppResult<bool>;
    fn list_keys(&self) -> AppResult<Vec<String>>;
}

pub fn validate_blob_key(key: &str) -> AppResult<()> {
    if BLOB_KEY_RE.is_match(key) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid blob key '{}'", key)))
    }
}

/// Loads and decodes a blob, falling back to `T::default()` when the key has
/// never been written.
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn BlobStore, key: &str) -> AppResult<T> {
    match store.get_blob(key)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

pub fn save_json<T: Serialize>(store: &dyn BlobStore, key: &str, value: &T) -> AppResult<()> {
    store.put_blob(key, &serde_json::to_value(value)?)
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn blob_revision(&self, key: &str) -> AppResult<Option<i64>> {
        validate_blob_key(key)?;
        let conn = self.lock()?;
        let revision = conn
            .query_row("SELECT revision FROM blobs WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(revision)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

impl BlobStore for Database {
    fn get_blob(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        validate_blob_key(key)?;
        let conn = self.lock()?;
        let raw = conn
            .query_row("SELECT value_json FROM blobs WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn put_blob(&self, key: &str, value: &serde_json::Value) -> AppResult<()> {
        validate_blob_key(key)?;
        let conn = self.lock()?;
        conn.execute(
            UPSERT_BLOB_SQL,
            params![key, serde_json::to_string(value)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn put_blobs(&self, entries: &[(&str, serde_json::Value)]) -> AppResult<()> {
        for (key, _) in entries {
            validate_blob_key(key)?;
        }
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT_BLOB_SQL, params![key, serde_json::to_string(value)?, now])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_blob(&self, key: &str) -> AppResult<bool> {
        validate_blob_key(key)?;
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }

    fn list_keys(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM blobs ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}
