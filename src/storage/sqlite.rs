//! SQLite-backed key-value store.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::KeyValueStore;
use crate::error::StorageResult;

/// Durable store kept in a single SQLite file.
/// Safe to share between several `scisum` processes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrent access
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
        "#,
        )?;

        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let value = conn
            .query_row(
                "SELECT value FROM client_state WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let now_ms = chrono::Utc::now().timestamp_millis();

        conn.execute(
            r#"INSERT INTO client_state (key, value, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, value, now_ms],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM client_state WHERE key = ?", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AUTH_TOKEN_KEY;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("client.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set(AUTH_TOKEN_KEY, "abc").unwrap();
            store.set(AUTH_TOKEN_KEY, "def").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("def"));

        store.remove(AUTH_TOKEN_KEY).unwrap();
        store.remove(AUTH_TOKEN_KEY).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
    }
}
