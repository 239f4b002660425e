//! Route definitions
//!
//! Defines the demonstration endpoints.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use sk_core::SessionManager;

use crate::handlers::{flash, flashes, get as get_value, health, keys, pop, set};
use crate::middleware::with_sessions;

/// Create the demo router (without the session layer)
pub fn routes() -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Key/value
        .route("/set", get(set))
        .route("/get", get(get_value))
        .route("/pop", get(pop))
        .route("/keys", get(keys))
        // Flash messages
        .route("/flash", get(flash))
        .route("/flashes", get(flashes))
}

/// Demo router with sessions and request tracing
pub fn app(manager: SessionManager) -> Router {
    with_sessions(routes(), manager).layer(TraceLayer::new_for_http())
}
