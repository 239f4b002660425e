//! HTTP handlers
//!
//! Demonstration endpoints exercising the session contract. They are
//! fixtures for conformance tests and the demo server, not library surface.

use axum::Json;
use axum::extract::Query;
use serde::Deserialize;
use tracing::debug;

use sk_core::FlashMessage;

use crate::error::{ApiError, Result};
use crate::extract::Session;

/// `?key=` query
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

/// `?key=&value=` query
#[derive(Debug, Deserialize)]
pub struct SetQuery {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// `?message=&kind=` query
#[derive(Debug, Deserialize)]
pub struct FlashQuery {
    pub message: String,
    pub kind: Option<String>,
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ApiError::InvalidRequest("key must not be empty".to_string()));
    }
    Ok(())
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Store a value, then echo what the session now holds
pub async fn set(session: Session, Query(query): Query<SetQuery>) -> Result<String> {
    require_key(&query.key)?;
    debug!("Set request: key={}", query.key);

    session.add(&query.key, &query.value).await?;
    Ok(session.get(&query.key).await)
}

pub async fn get(session: Session, Query(query): Query<KeyQuery>) -> String {
    session.get(&query.key).await
}

pub async fn pop(session: Session, Query(query): Query<KeyQuery>) -> String {
    session.pop(&query.key).await
}

/// Queue a flash message
pub async fn flash(
    session: Session,
    Query(query): Query<FlashQuery>,
) -> Result<Json<FlashMessage>> {
    let mut message = FlashMessage::new(query.message);
    if let Some(kind) = query.kind {
        message = message.with_kind(kind);
    }

    session.flash(message.clone()).await?;
    Ok(Json(message))
}

/// Drain queued flash messages
pub async fn flashes(session: Session) -> Json<Vec<FlashMessage>> {
    Json(session.flashes().await)
}

/// Keys stored in the current session
pub async fn keys(session: Session) -> Result<Json<Vec<String>>> {
    Ok(Json(session.keys().await?))
}
