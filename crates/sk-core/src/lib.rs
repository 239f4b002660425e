//! sk-core: sessionkit core library
//!
//! Request-scoped key/value sessions: value encoding, pluggable stores,
//! flash messages and the manager that combines them.

pub mod codec;
pub mod config;
pub mod error;
pub mod session;
pub mod store;

pub use codec::{Codec, Encoded, JsonCodec, ValueKind};
pub use config::{CookieSettings, SameSitePolicy, ServerConfig, SessionConfig, StoreBackend, StoreConfig};
pub use error::{Error, Result};
pub use session::{FLASH_KEY, FlashMessage, SessionContext, SessionId, SessionManager};
pub use store::{MemoryStore, SqliteStore, Store};
