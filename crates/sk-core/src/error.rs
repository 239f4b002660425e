//! Error types for sk-core

use thiserror::Error;

/// Main error type for sk-core
#[derive(Error, Debug)]
pub enum Error {
    /// Key (or whole session) absent on a read
    #[error("Session value not found: {0}")]
    NotFound(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// Backend failure, passed through from the store implementation
    #[error("Store error: {0}")]
    Store(String),

    #[error("Key is reserved for internal use: {0}")]
    ReservedKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl Error {
    /// Whether this error only reports an absent key
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for sk-core
pub type Result<T> = std::result::Result<T, Error>;
