//! Echo Agent - per-conversation echo actors over HTTP
//!
//! Each conversation is served by one actor that echoes input, keeps an
//! append-only history in SQLite, and honors a cancel signal.

mod api;
mod config;
mod db;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::ServerConfig;
use db::Database;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echo_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Create application state
    let state = AppState::new(db, config.runtime());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    // Start server
    let addr = config.addr();
    tracing::info!(
        idle_timeout_secs = config.idle_timeout.map(|d| d.as_secs()),
        "Echo agent listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
