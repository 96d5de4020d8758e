//! pokedex-lookup - Tiered record lookup service
//!
//! Serves `GET /records/:key` by checking an in-process cache, then the
//! SQLite record store, then PokeAPI, populating the faster tiers on the way
//! back.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pokedex_common::config::{resolve_config_path, TomlConfig};
use pokedex_common::db::init::open_database;
use pokedex_lookup::services::{
    InMemoryCache, PokeApiClient, RecordPipeline, RecordStore, SqliteRecordStore,
};
use pokedex_lookup::{build_router, AppState};

/// Command-line arguments for pokedex-lookup
#[derive(Parser, Debug)]
#[command(name = "pokedex-lookup")]
#[command(about = "Tiered record lookup service")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to POKEDEX_CONFIG, then the user/system config dirs)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "POKEDEX_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(short, long, env = "POKEDEX_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref())?;
    let mut config = TomlConfig::load(config_path.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting pokedex-lookup v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file, using built-in defaults"),
    }

    let pool = open_database(&config.database_path)
        .await
        .context("Failed to open record database")?;
    let store = SqliteRecordStore::new(pool);
    store
        .initialize()
        .await
        .context("Failed to initialize record schema")?;
    info!("✓ Record store ready: {}", config.database_path.display());

    let source = PokeApiClient::new(&config.source).context("Failed to create PokeAPI client")?;
    info!("External source: {}", config.source.base_url);

    let cache = InMemoryCache::new(config.cache.max_entries);

    let pipeline = RecordPipeline::new(Arc::new(cache), Arc::new(store), Arc::new(source))
        .with_cache_policy(config.cache.failure_policy)
        .with_coalescing(config.pipeline.coalesce_inflight);
    info!(
        cache_policy = ?pipeline.cache_policy(),
        coalesce_inflight = config.pipeline.coalesce_inflight,
        "Lookup pipeline configured"
    );

    let state = AppState::new(Arc::new(pipeline), config.request_timeout());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("pokedex-lookup listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
