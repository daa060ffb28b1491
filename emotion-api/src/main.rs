//! emotion-api - Emotion Analysis Service
//!
//! **Module Identity:**
//! - Name: emotion-api
//! - Default port: 5080 (`PORT` or `--port` overrides)
//!
//! Forwards text to a hosted classifier, normalizes its label/score answer
//! and keeps a queryable history in SQLite.

use anyhow::Result;
use clap::Parser;
use emotion_common::ServiceConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use emotion_api::services::{spawn_sweeper, CorrelationCache, InferenceClient};
use emotion_api::AppState;

/// Command-line arguments (highest configuration priority)
#[derive(Debug, Parser)]
#[command(name = "emotion-api", version, about = "Emotion analysis service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::resolve(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = Some(database);
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        build_profile = env!("BUILD_PROFILE"),
        "Starting emotion-api"
    );

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = emotion_api::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let correlations = Arc::new(CorrelationCache::new(Duration::from_secs(
        config.inference.correlation_ttl_secs,
    )));
    let client = InferenceClient::new(&config.inference, correlations.clone())?;
    info!(
        upstream = %config.inference.submit_url(),
        max_retries = config.inference.max_retries,
        retry_delay_ms = config.inference.retry_delay_ms,
        "Inference client ready"
    );

    let state = AppState::new(db_pool, client);
    let shutdown = state.shutdown.clone();
    spawn_sweeper(correlations, shutdown.clone());
    let app = emotion_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("emotion-api stopped");
    Ok(())
}

/// Resolve on Ctrl-C and cancel in-flight analyses
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
