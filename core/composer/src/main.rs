use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weekly_journal_composer::{router, AppState, Config};
use weekly_journal_store::Database;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Weekly Journal Service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::parse();

    // Missing credentials are a startup error, not a per-request one
    let generator = config.build_generator()?;
    info!(
        "Summary provider: {} (timeout {:?})",
        generator.name(),
        config.generation_timeout()
    );

    // Create directory if it doesn't exist
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(&config.db_path)?;
    info!("Database initialized at: {}", config.db_path.display());

    let state = AppState::new(db, generator, config.generation_timeout());
    let app = router(state);

    info!("Starting HTTP server on http://{}", config.addr);
    info!("Entries endpoint: http://{}/api/entries", config.addr);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
