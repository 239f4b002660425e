//! In-memory session store
//!
//! Per-process storage; everything is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::Result;
use crate::session::SessionId;
use crate::store::Store;

#[derive(Debug)]
struct Entry {
    values: HashMap<String, Vec<u8>>,
    touched_at: DateTime<Utc>,
}

impl Entry {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            touched_at: Utc::now(),
        }
    }
}

/// DashMap-backed store with an optional idle timeout
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sessions: Arc<DashMap<SessionId, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryStore {
    /// Create a store whose sessions never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that forgets sessions idle for longer than `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Number of sessions currently held, expired ones included
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop expired sessions, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| !self.is_expired(entry));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .is_some_and(|ttl| Utc::now().signed_duration_since(entry.touched_at) > ttl)
    }

    /// Refresh the idle clock, emptying the entry first if it already expired
    fn touch(&self, entry: &mut Entry) {
        if self.is_expired(entry) {
            entry.values.clear();
        }
        entry.touched_at = Utc::now();
    }

    fn drop_if_empty(&self, id: &SessionId) {
        self.sessions.remove_if(id, |_, entry| entry.values.is_empty());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return Ok(None);
        };
        self.touch(&mut entry);
        Ok(entry.values.get(key).cloned())
    }

    async fn write(&self, id: &SessionId, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entry = self.sessions.entry(id.clone()).or_insert_with(Entry::new);
        self.touch(&mut entry);
        entry.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &SessionId, key: &str) -> Result<()> {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            self.touch(&mut entry);
            entry.values.remove(key);
        }
        self.drop_if_empty(id);
        Ok(())
    }

    async fn read_all(&self, id: &SessionId) -> Result<HashMap<String, Vec<u8>>> {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return Ok(HashMap::new());
        };
        self.touch(&mut entry);
        Ok(entry.values.clone())
    }

    async fn take(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        // The shard lock is held across read and removal.
        let value = match self.sessions.get_mut(id) {
            Some(mut entry) => {
                self.touch(&mut entry);
                entry.values.remove(key)
            }
            None => None,
        };
        self.drop_if_empty(id);
        Ok(value)
    }

    async fn clear(&self, id: &SessionId) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let store = MemoryStore::new();
        let id = SessionId::generate();

        store.write(&id, "key", b"value".to_vec()).await.unwrap();

        assert_eq!(store.read(&id, "key").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.read(&id, "missing").await.unwrap(), None);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryStore::new();
        let id1 = SessionId::generate();
        let id2 = SessionId::generate();

        store.write(&id1, "key", b"one".to_vec()).await.unwrap();

        assert_eq!(store.read(&id2, "key").await.unwrap(), None);
        assert!(store.read_all(&id2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_take_removes_value() {
        let store = MemoryStore::new();
        let id = SessionId::generate();

        store.write(&id, "key", b"value".to_vec()).await.unwrap();

        assert_eq!(store.take(&id, "key").await.unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.take(&id, "key").await.unwrap(), None);
        // Last key gone, so the session entry is gone too
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        let id = SessionId::generate();

        store.write(&id, "key", b"value".to_vec()).await.unwrap();
        assert!(other.read(&id, "key").await.unwrap().is_some());

        other.clear(&id).await.unwrap();
        assert!(store.read(&id, "key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_read_empty() {
        let store = MemoryStore::with_ttl(Duration::zero());
        let id = SessionId::generate();

        store.write(&id, "key", b"value".to_vec()).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(store.read(&id, "key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::with_ttl(Duration::zero());
        store.write(&SessionId::generate(), "a", vec![1]).await.unwrap();
        store.write(&SessionId::generate(), "b", vec![2]).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.session_count(), 0);

        let keeper = MemoryStore::new();
        keeper.write(&SessionId::generate(), "a", vec![1]).await.unwrap();
        assert_eq!(keeper.purge_expired(), 0);
    }
}
