//! Key-value media backing the task store.
//!
//! # Responsibility
//! - Provide a minimal string key-value contract (`get/set/remove/usage`).
//! - Offer an in-memory medium for tests and a SQLite file medium for the CLI.
//!
//! # Invariants
//! - `usage_bytes` counts key and value bytes of every stored entry.
//! - `set` replaces any previous value for the key in one statement.

use crate::db::{open_db, open_db_in_memory, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type KvResult<T> = Result<T, KvError>;

/// Error raised by a key-value medium.
#[derive(Debug)]
pub enum KvError {
    /// The medium refuses all access.
    Unavailable(String),
    Db(DbError),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage medium unavailable: {reason}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Local string key-value medium.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> KvResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> KvResult<()>;
    /// Approximate bytes held by the medium.
    fn usage_bytes(&self) -> KvResult<u64>;
}

/// Process-local medium with an availability switch.
#[derive(Debug, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
    available: bool,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            available: true,
        }
    }

    /// Simulates a medium that rejects every call (e.g. disabled storage).
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Reads an entry regardless of the availability switch.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn ensure_available(&self) -> KvResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(KvError::Unavailable("memory medium disabled".to_string()))
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.ensure_available()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
        self.ensure_available()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        self.ensure_available()?;
        self.entries.remove(key);
        Ok(())
    }

    fn usage_bytes(&self) -> KvResult<u64> {
        self.ensure_available()?;
        Ok(self
            .entries
            .iter()
            .map(|(key, value)| (key.len() + value.len()) as u64)
            .sum())
    }
}

/// SQLite-backed medium storing entries in `kv_entries`.
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> KvResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> KvResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn usage_bytes(&self) -> KvResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(
                SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))),
                0
             ) FROM kv_entries;",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, KvError, MemoryKeyValueStore, SqliteKeyValueStore};

    fn exercise(store: &mut dyn KeyValueStore) {
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.usage_bytes().unwrap(), 0);

        store.set("k", "value").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.usage_bytes().unwrap(), 3);

        store.set("ключ", "é").unwrap();
        assert_eq!(store.usage_bytes().unwrap(), 3 + 8 + 2);

        store.remove("k").unwrap();
        store.remove("missing").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn memory_medium_contract() {
        exercise(&mut MemoryKeyValueStore::new());
    }

    #[test]
    fn sqlite_medium_contract() {
        exercise(&mut SqliteKeyValueStore::open_in_memory().unwrap());
    }

    #[test]
    fn disabled_memory_medium_rejects_calls() {
        let mut store = MemoryKeyValueStore::new();
        store.set("k", "v").unwrap();
        store.set_available(false);

        assert!(matches!(store.get("k"), Err(KvError::Unavailable(_))));
        assert!(matches!(store.set("k", "x"), Err(KvError::Unavailable(_))));
        assert_eq!(store.peek("k"), Some("v"));
    }
}
