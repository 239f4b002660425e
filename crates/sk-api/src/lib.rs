//! sk-api: HTTP integration for sessionkit
//!
//! Cookie-based session middleware for axum, a request extractor, and a
//! small set of demonstration routes.

pub mod cookie;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use cookie::CookieSigner;
pub use error::{ApiError, Result};
pub use extract::Session;
pub use middleware::{CookieTransport, session_middleware, with_sessions};
pub use routes::{app, routes};
pub use server::start_server;
