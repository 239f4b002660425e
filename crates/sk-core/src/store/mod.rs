//! Session value storage
//!
//! The manager only talks to the [`Store`] trait; backends decide where the
//! bytes live and for how long.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::Result;
use crate::session::SessionId;

/// Storage backend for session values, keyed by (session id, key)
///
/// Operations on distinct keys are independent and no ordering between keys
/// is implied. Failures must be returned as `Error::Store`, never by blocking.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read one value, `None` when absent
    async fn read(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write one value, replacing any previous one
    async fn write(&self, id: &SessionId, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete one value; deleting an absent key is not an error
    async fn delete(&self, id: &SessionId, key: &str) -> Result<()>;

    /// Every value stored for the session
    async fn read_all(&self, id: &SessionId) -> Result<HashMap<String, Vec<u8>>>;

    /// Read and delete one value
    ///
    /// The default is not atomic; backends should override it.
    async fn take(&self, id: &SessionId, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.read(id, key).await?;
        if value.is_some() {
            self.delete(id, key).await?;
        }
        Ok(value)
    }

    /// Drop the whole session
    async fn clear(&self, id: &SessionId) -> Result<()> {
        let values = self.read_all(id).await?;
        for key in values.keys() {
            self.delete(id, key).await?;
        }
        Ok(())
    }
}
