//! HTTP Server
//!
//! Starts the axum-based demo server.

use std::net::SocketAddr;
use tracing::info;

use sk_core::SessionManager;

use crate::routes::app;

/// Start the demo server
pub async fn start_server(port: u16, manager: SessionManager) -> anyhow::Result<()> {
    let app = app(manager);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
