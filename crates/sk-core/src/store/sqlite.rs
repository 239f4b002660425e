//! Session persistence using SQLite

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::session::SessionId;
use crate::store::Store;
use crate::{Error, Result};

/// SQLite-based session store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn timestamp(at: chrono::DateTime<Utc>) -> String {
    // Fixed width so timestamps compare correctly as text
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SqliteStore {
    /// Create a new session store with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening session database at: {}", db_path);
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        info!("SqliteStore initialized successfully");
        Ok(store)
    }

    /// Create an in-memory session store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("session database lock poisoned".to_string()))
    }

    /// Initialize database tables
    fn init_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_values (
                session_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (session_id, key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_values_updated_at ON session_values(updated_at)",
            [],
        )?;

        Ok(())
    }

    fn read_locked(conn: &Connection, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        let result = conn.query_row(
            "SELECT value FROM session_values WHERE session_id = ?1 AND key = ?2",
            params![id.as_str(), key],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Delete rows not written for longer than `age`
    pub fn purge_older_than(&self, age: Duration) -> Result<usize> {
        let cutoff = timestamp(Utc::now() - age);
        let affected = self.conn()?.execute(
            "DELETE FROM session_values WHERE updated_at < ?1",
            params![cutoff],
        )?;
        if affected > 0 {
            debug!("Purged {} stale session values", affected);
        }
        Ok(affected)
    }

    /// Count distinct sessions with at least one value
    pub fn session_count(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM session_values",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn read(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        Self::read_locked(&conn, id, key)
    }

    async fn write(&self, id: &SessionId, key: &str, value: Vec<u8>) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO session_values (session_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), key, value, timestamp(Utc::now())],
        )?;
        Ok(())
    }

    async fn delete(&self, id: &SessionId, key: &str) -> Result<()> {
        self.conn()?.execute(
            "DELETE FROM session_values WHERE session_id = ?1 AND key = ?2",
            params![id.as_str(), key],
        )?;
        Ok(())
    }

    async fn read_all(&self, id: &SessionId) -> Result<HashMap<String, Vec<u8>>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM session_values WHERE session_id = ?1")?;

        let rows = stmt.query_map(params![id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut result = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            result.insert(key, value);
        }
        Ok(result)
    }

    async fn take(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        // One connection behind one lock: nothing can interleave here.
        let conn = self.conn()?;
        let value = Self::read_locked(&conn, id, key)?;
        if value.is_some() {
            conn.execute(
                "DELETE FROM session_values WHERE session_id = ?1 AND key = ?2",
                params![id.as_str(), key],
            )?;
        }
        Ok(value)
    }

    async fn clear(&self, id: &SessionId) -> Result<()> {
        self.conn()?.execute(
            "DELETE FROM session_values WHERE session_id = ?1",
            params![id.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_creation() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.session_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_read_overwrite() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SessionId::generate();

        store.write(&id, "key", b"first".to_vec()).await.unwrap();
        store.write(&id, "key", b"second".to_vec()).await.unwrap();

        assert_eq!(store.read(&id, "key").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.session_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_take_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SessionId::generate();

        store.write(&id, "a", vec![1]).await.unwrap();
        store.write(&id, "b", vec![2]).await.unwrap();

        assert_eq!(store.take(&id, "a").await.unwrap(), Some(vec![1]));
        assert_eq!(store.take(&id, "a").await.unwrap(), None);

        store.delete(&id, "b").await.unwrap();
        store.delete(&id, "b").await.unwrap();
        assert!(store.read_all(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_all_and_clear() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SessionId::generate();
        let other = SessionId::generate();

        store.write(&id, "a", vec![1]).await.unwrap();
        store.write(&id, "b", vec![2]).await.unwrap();
        store.write(&other, "a", vec![9]).await.unwrap();

        let all = store.read_all(&id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("b"), Some(&vec![2]));

        store.clear(&id).await.unwrap();
        assert!(store.read_all(&id).await.unwrap().is_empty());
        assert_eq!(store.read(&other, "a").await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let store = SqliteStore::in_memory().unwrap();
        let id = SessionId::generate();
        store.write(&id, "key", vec![1]).await.unwrap();

        assert_eq!(store.purge_older_than(Duration::hours(1)).unwrap(), 0);
        assert_eq!(store.purge_older_than(Duration::hours(-1)).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let path = path.to_str().unwrap();
        let id = SessionId::generate();

        {
            let store = SqliteStore::new(path).unwrap();
            store.write(&id, "key", b"value".to_vec()).await.unwrap();
        }

        let reopened = SqliteStore::new(path).unwrap();
        assert_eq!(reopened.read(&id, "key").await.unwrap(), Some(b"value".to_vec()));
    }
}
