//! Aurelion Server: content-addressed file sync service
//!
//! Main entry point that wires all crates together and starts the server.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use aurelion_api::{AppState, Backends, build_router};
use aurelion_core::config::AppConfig;
use aurelion_core::error::AppError;
use aurelion_database::DatabasePool;
use aurelion_storage::LocalStorageProvider;
use aurelion_storage::thumbnail::{MediaTranscoder, ThumbnailSpec};

#[tokio::main]
async fn main() {
    let env = std::env::var("AURELION_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Aurelion v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        aurelion_database::migration::run_migrations(db_pool.pool()).await?;
        tracing::info!("Database migrations complete");
    }

    let (files, ledger) = db_pool.repositories();

    // ── Step 2: Storage providers ────────────────────────────────
    let content = Arc::new(LocalStorageProvider::new(&config.storage.root).await?);
    let thumbnails = Arc::new(LocalStorageProvider::new(&config.thumbnails.root).await?);
    tracing::info!(
        content_root = %content.root().display(),
        thumbnail_root = %thumbnails.root().display(),
        "Storage providers initialized"
    );

    // ── Step 3: Thumbnail transcoder ─────────────────────────────
    let renderer = Arc::new(MediaTranscoder::new(ThumbnailSpec::from(&config.thumbnails)));
    tracing::info!(
        size = config.thumbnails.size,
        workers = config.thumbnails.workers,
        "Thumbnail transcoder ready"
    );

    // ── Step 4: Build application state and router ───────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let app_state = AppState::new(
        config,
        Backends {
            files,
            ledger,
            content,
            thumbnails,
            renderer,
        },
    );
    let app = build_router(app_state);

    // ── Step 5: Bind and serve ───────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("Aurelion server listening on {}", addr);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
        })
        .into_future();

    // ── Step 6: Graceful shutdown with a deadline ────────────────
    let deadline = async move {
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = deadline => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Shutdown grace period elapsed, dropping open connections"
            );
        }
    }

    db_pool.close().await;
    tracing::info!("Aurelion server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
