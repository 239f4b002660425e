//! Session extractor
//!
//! Gives handlers the manager bound to the current request's context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use serde::de::DeserializeOwned;

use sk_core::{Codec, FlashMessage, JsonCodec, SessionContext, SessionId, SessionManager};

use crate::error::ApiError;

/// Request-bound session handle
///
/// Only available on routes wrapped by the session middleware; elsewhere
/// extraction fails with [`ApiError::MissingSession`].
pub struct Session<C: Codec = JsonCodec> {
    manager: SessionManager<C>,
    ctx: SessionContext,
}

impl<S, C> FromRequestParts<S> for Session<C>
where
    S: Send + Sync,
    C: Codec,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(ApiError::MissingSession)?;
        let manager = parts
            .extensions
            .get::<SessionManager<C>>()
            .cloned()
            .ok_or(ApiError::MissingSession)?;

        Ok(Self { manager, ctx })
    }
}

impl<C: Codec> Session<C> {
    pub fn id(&self) -> &SessionId {
        self.ctx.id()
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub async fn add<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> sk_core::Result<()> {
        self.manager.add(&self.ctx, key, value).await
    }

    pub async fn get_value(&self, key: &str) -> sk_core::Result<Option<String>> {
        self.manager.get_value(&self.ctx, key).await
    }

    pub async fn get(&self, key: &str) -> String {
        self.manager.get(&self.ctx, key).await
    }

    pub async fn pop_value(&self, key: &str) -> sk_core::Result<Option<String>> {
        self.manager.pop_value(&self.ctx, key).await
    }

    pub async fn pop(&self, key: &str) -> String {
        self.manager.pop(&self.ctx, key).await
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> sk_core::Result<T> {
        self.manager.load(&self.ctx, key).await
    }

    pub async fn pop_load<T: DeserializeOwned>(&self, key: &str) -> sk_core::Result<T> {
        self.manager.pop_load(&self.ctx, key).await
    }

    pub async fn flash(&self, message: FlashMessage) -> sk_core::Result<()> {
        self.manager.flash(&self.ctx, message).await
    }

    pub async fn flashes(&self) -> Vec<FlashMessage> {
        self.manager.flashes(&self.ctx).await
    }

    pub async fn keys(&self) -> sk_core::Result<Vec<String>> {
        self.manager.keys(&self.ctx).await
    }

    pub async fn clear(&self) -> sk_core::Result<()> {
        self.manager.clear(&self.ctx).await
    }
}
