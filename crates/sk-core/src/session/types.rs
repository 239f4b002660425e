//! Session types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Longest identifier accepted from a client
const MAX_ID_LEN: usize = 128;

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a new random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validate an identifier presented by a client
    ///
    /// Only URL-safe ASCII (`[A-Za-z0-9_-]`) up to 128 characters is accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One-time notification queued for a later request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Text shown to the user
    pub message: String,
    /// Optional classification such as "success" or "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FlashMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Request-scoped session context
///
/// Carries the resolved id for a single request. Clones share the modified
/// flag so the middleware sees writes made through handler-side copies; a
/// context must never be reused for another request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<ContextState>,
}

#[derive(Debug)]
struct ContextState {
    id: SessionId,
    fresh: bool,
    modified: AtomicBool,
}

impl SessionContext {
    /// Context for an id presented by the client
    pub fn new(id: SessionId) -> Self {
        Self::build(id, false)
    }

    /// Context for a newly minted id
    pub fn fresh() -> Self {
        Self::build(SessionId::generate(), true)
    }

    fn build(id: SessionId, fresh: bool) -> Self {
        Self {
            inner: Arc::new(ContextState {
                id,
                fresh,
                modified: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    /// Whether the id was minted during this request
    pub fn is_fresh(&self) -> bool {
        self.inner.fresh
    }

    /// Whether any write or consuming read touched the session
    pub fn is_modified(&self) -> bool {
        self.inner.modified.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_modified(&self) {
        self.inner.modified.store(true, Ordering::Relaxed);
    }
}
