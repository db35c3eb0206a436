//! Bookshelf Server - in-memory book catalog
//!
//! A small Rust REST API over a seeded, in-memory collection of books.

use std::net::SocketAddr;

use anyhow::Context;

use bookshelf_server::{api, config::AppConfig, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; the guard keeps the file writer alive
    let _log_guard = logging::init(&config.logging)?;

    let addr = config.bind_address();
    tracing::info!(
        "Starting book API server v{} on http://{}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let state = AppState::new(config);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
