//! Session management

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::{Codec, Encoded, JsonCodec};
use crate::config::{CookieSettings, SessionConfig, StoreBackend};
use crate::session::{FlashMessage, SessionContext};
use crate::store::{MemoryStore, SqliteStore, Store};
use crate::{Error, Result};

/// Store key holding the flash queue; hidden from the key/value operations
pub const FLASH_KEY: &str = "__flashes";

/// Session manager that binds a store and a codec to request contexts
///
/// Built once at startup and shared by every request. It holds no mutable
/// state of its own; everything request-specific lives in [`SessionContext`].
pub struct SessionManager<C: Codec = JsonCodec> {
    store: Arc<dyn Store>,
    codec: Arc<C>,
    cookie: Arc<CookieSettings>,
}

impl<C: Codec> Clone for SessionManager<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: Arc::clone(&self.codec),
            cookie: Arc::clone(&self.cookie),
        }
    }
}

impl SessionManager<JsonCodec> {
    /// Create a manager with the JSON codec and default cookie settings
    pub fn new(store: impl Store + 'static) -> Self {
        Self::with_codec(store, JsonCodec)
    }

    /// Build the store backend described by the configuration
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let store: Arc<dyn Store> = match config.store.backend {
            StoreBackend::Memory => match config.store.ttl() {
                Some(ttl) => Arc::new(MemoryStore::with_ttl(ttl)),
                None => Arc::new(MemoryStore::new()),
            },
            StoreBackend::Sqlite => Arc::new(SqliteStore::new(&config.store.db_path)?),
        };

        Ok(Self::from_parts(store, JsonCodec, config.cookie.clone()))
    }
}

impl<C: Codec> SessionManager<C> {
    /// Create a manager with a custom codec
    pub fn with_codec(store: impl Store + 'static, codec: C) -> Self {
        Self::from_parts(Arc::new(store), codec, CookieSettings::default())
    }

    pub fn from_parts(store: Arc<dyn Store>, codec: C, cookie: CookieSettings) -> Self {
        Self {
            store,
            codec: Arc::new(codec),
            cookie: Arc::new(cookie),
        }
    }

    /// Replace the cookie settings
    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = Arc::new(cookie);
        self
    }

    pub fn cookie_settings(&self) -> &CookieSettings {
        &self.cookie
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn check_key(key: &str) -> Result<()> {
        if key == FLASH_KEY {
            return Err(Error::ReservedKey(key.to_string()));
        }
        Ok(())
    }

    fn parse_raw(raw: Option<Vec<u8>>) -> Result<Option<Encoded>> {
        match raw {
            Some(raw) if !raw.is_empty() => Encoded::from_bytes(&raw).map(Some),
            _ => Ok(None),
        }
    }

    async fn read_encoded(&self, ctx: &SessionContext, key: &str) -> Result<Option<Encoded>> {
        if key == FLASH_KEY {
            return Ok(None);
        }
        Self::parse_raw(self.store.read(ctx.id(), key).await?)
    }

    fn decode_text(&self, encoded: Option<Encoded>) -> Result<Option<String>> {
        match encoded {
            Some(encoded) if encoded.is_text() => self.codec.decode(&encoded).map(Some),
            _ => Ok(None),
        }
    }

    /// Store a value under `key`, replacing any previous one
    pub async fn add<T: Serialize + ?Sized>(
        &self,
        ctx: &SessionContext,
        key: &str,
        value: &T,
    ) -> Result<()> {
        Self::check_key(key)?;
        let encoded = self.codec.encode(value)?;
        self.store.write(ctx.id(), key, encoded.to_bytes()).await?;
        ctx.mark_modified();
        debug!("Session {}: stored key {}", ctx.id(), key);
        Ok(())
    }

    /// Read a text value
    ///
    /// `Ok(None)` when nothing is stored or the stored value is not text;
    /// `Ok(Some(""))` when an empty string was stored.
    pub async fn get_value(&self, ctx: &SessionContext, key: &str) -> Result<Option<String>> {
        let encoded = self.read_encoded(ctx, key).await?;
        self.decode_text(encoded)
    }

    /// Read a text value, empty when absent
    pub async fn get(&self, ctx: &SessionContext, key: &str) -> String {
        match self.get_value(ctx, key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!("Session {}: failed to read key {}: {}", ctx.id(), key, e);
                String::new()
            }
        }
    }

    /// Read a text value and remove the key in one store operation
    ///
    /// Non-text values are left in place and reported as `Ok(None)`.
    pub async fn pop_value(&self, ctx: &SessionContext, key: &str) -> Result<Option<String>> {
        match self.read_encoded(ctx, key).await? {
            Some(encoded) if encoded.is_text() => {}
            _ => return Ok(None),
        }

        let Some(raw) = self.store.take(ctx.id(), key).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let encoded = Encoded::from_bytes(&raw)?;
        if !encoded.is_text() {
            // Replaced by a non-text value between the read and the take
            self.store.write(ctx.id(), key, raw).await?;
            return Ok(None);
        }

        ctx.mark_modified();
        self.codec.decode(&encoded).map(Some)
    }

    /// Consume a text value, empty when absent
    pub async fn pop(&self, ctx: &SessionContext, key: &str) -> String {
        match self.pop_value(ctx, key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!("Session {}: failed to pop key {}: {}", ctx.id(), key, e);
                String::new()
            }
        }
    }

    /// Decode the value under `key` without consuming it
    ///
    /// Fails with `Error::NotFound` when absent and `Error::Decode` when the
    /// stored value does not fit `T`.
    pub async fn load<T: DeserializeOwned>(&self, ctx: &SessionContext, key: &str) -> Result<T> {
        match self.read_encoded(ctx, key).await? {
            Some(encoded) => self.codec.decode(&encoded),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    /// [`load`](Self::load) into an existing value
    pub async fn load_into<T: DeserializeOwned>(
        &self,
        ctx: &SessionContext,
        key: &str,
        target: &mut T,
    ) -> Result<()> {
        *target = self.load(ctx, key).await?;
        Ok(())
    }

    /// Decode the value under `key`, deleting it only if decoding succeeded
    pub async fn pop_load<T: DeserializeOwned>(
        &self,
        ctx: &SessionContext,
        key: &str,
    ) -> Result<T> {
        let value = self.load(ctx, key).await?;
        self.store.delete(ctx.id(), key).await?;
        ctx.mark_modified();
        Ok(value)
    }

    /// Append a flash message to the session's queue
    pub async fn flash(&self, ctx: &SessionContext, message: FlashMessage) -> Result<()> {
        let mut queue: Vec<FlashMessage> =
            match Self::parse_raw(self.store.read(ctx.id(), FLASH_KEY).await?)? {
                Some(encoded) => self.codec.decode(&encoded)?,
                None => Vec::new(),
            };

        queue.push(message);

        let encoded = self.codec.encode(&queue)?;
        self.store.write(ctx.id(), FLASH_KEY, encoded.to_bytes()).await?;
        ctx.mark_modified();
        debug!("Session {}: {} flash messages queued", ctx.id(), queue.len());
        Ok(())
    }

    /// Take every queued flash message, oldest first
    pub async fn flashes(&self, ctx: &SessionContext) -> Vec<FlashMessage> {
        match self.take_flashes(ctx).await {
            Ok(queue) => queue,
            Err(e) => {
                warn!("Session {}: failed to read flash messages: {}", ctx.id(), e);
                Vec::new()
            }
        }
    }

    async fn take_flashes(&self, ctx: &SessionContext) -> Result<Vec<FlashMessage>> {
        let raw = self.store.take(ctx.id(), FLASH_KEY).await?;
        if raw.is_some() {
            ctx.mark_modified();
        }
        match Self::parse_raw(raw)? {
            Some(encoded) => self.codec.decode(&encoded),
            None => Ok(Vec::new()),
        }
    }

    /// Keys stored in this session, sorted
    pub async fn keys(&self, ctx: &SessionContext) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .store
            .read_all(ctx.id())
            .await?
            .into_keys()
            .filter(|key| key != FLASH_KEY)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Drop every value of this session, flash queue included
    pub async fn clear(&self, ctx: &SessionContext) -> Result<()> {
        self.store.clear(ctx.id()).await?;
        ctx.mark_modified();
        debug!("Session {}: cleared", ctx.id());
        Ok(())
    }
}
