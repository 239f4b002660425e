//! sk-server: sessionkit demo server
//!
//! Serves the demonstration session routes.
//!
//! Usage:
//!   sk-server                  - Start the server
//!   sk-server --config <path>  - Use a specific TOML file
//!   sk-server --help           - Show help

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sk_core::{JsonCodec, MemoryStore, SessionConfig, SessionManager, SqliteStore, StoreBackend};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Serve, optionally with an explicit config file
    Server(Option<String>),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("sk-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server(path) => path,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = match config_path {
        Some(path) => SessionConfig::from_toml_file(path),
        None => SessionConfig::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting sk-server...");
    tracing::info!(
        "Store: {:?}, cookie: {}",
        config.store.backend,
        config.cookie.name
    );

    let manager = build_manager(&config)?;
    let port = config.server.port;

    let server = tokio::spawn(async move {
        if let Err(e) = sk_api::start_server(port, manager).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tracing::info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    server.abort();

    Ok(())
}

/// Create the session manager, starting a purge task when a TTL is configured
fn build_manager(config: &SessionConfig) -> anyhow::Result<SessionManager> {
    match (config.store.backend, config.store.ttl()) {
        (StoreBackend::Memory, Some(ttl)) => {
            let store = MemoryStore::with_ttl(ttl);
            spawn_purge(store.clone(), ttl.to_std().unwrap_or(Duration::from_secs(60)));
            Ok(SessionManager::from_parts(
                Arc::new(store),
                JsonCodec,
                config.cookie.clone(),
            ))
        }
        (StoreBackend::Sqlite, ttl) => {
            if let Some(dir) = Path::new(&config.store.db_path).parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir)?;
                }
            }
            let store = Arc::new(
                SqliteStore::new(&config.store.db_path)
                    .map_err(|e| anyhow::anyhow!("Failed to open session store: {}", e))?,
            );
            if let Some(ttl) = ttl {
                spawn_sqlite_purge(Arc::clone(&store), ttl);
            }
            Ok(SessionManager::from_parts(
                store,
                JsonCodec,
                config.cookie.clone(),
            ))
        }
        _ => SessionManager::from_config(config)
            .map_err(|e| anyhow::anyhow!("Failed to create session manager: {}", e)),
    }
}

fn spawn_purge(store: MemoryStore, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::info!("Purged {} idle sessions", purged);
            }
        }
    });
}

/// Periodically drop rows not written within `ttl`
fn spawn_sqlite_purge(store: Arc<SqliteStore>, ttl: chrono::Duration) {
    let every = ttl.to_std().unwrap_or(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            match store.purge_older_than(ttl) {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} stale session values", purged),
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
        }
    });
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            "--config" | "-c" => return RunMode::Server(args.next()),
            _ => {}
        }
    }

    RunMode::Server(None)
}

/// Print help message
fn print_help() {
    println!("sk-server - sessionkit demo server");
    println!();
    println!("Usage:");
    println!("  sk-server                  Start the server");
    println!("  sk-server --config <path>  Load settings from a TOML file");
    println!("  sk-server --help           Show this help message");
    println!("  sk-server --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  SESSION_COOKIE_NAME  Cookie name (default: sk_session)");
    println!("  SESSION_SECRET       HMAC secret for signed cookies");
    println!("  SESSION_SECURE       Set the Secure cookie flag (default: false)");
    println!("  SESSION_MAX_AGE      Cookie Max-Age in seconds (default: 1209600)");
    println!("  SESSION_SAME_SITE    strict, lax or none (default: lax)");
    println!("  SESSION_STORE        memory or sqlite (default: memory)");
    println!("  SESSION_DB_PATH      SQLite path (default: data/sessions.db)");
    println!("  SESSION_TTL          Session idle timeout / sqlite purge age, in seconds");
    println!("  SERVER_PORT          HTTP port (default: 3000)");
}
