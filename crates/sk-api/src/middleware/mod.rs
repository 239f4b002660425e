//! Middleware modules
//!
//! Contains the session middleware and its cookie transport.

pub mod session;

pub use session::{CookieTransport, session_middleware, with_sessions};
