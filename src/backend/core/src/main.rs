//! Tollbooth Server - Main entry point

use clap::Parser;
use std::sync::Arc;

use tollbooth_core::{
    api::{self, AppState},
    bootstrap,
    config::{Config, StorageBackend},
    observability,
    store::{MemoryStore, PgStore, Store},
};

#[derive(Parser)]
#[command(name = "tollbooth-server", version, about = "Subscription and permission gateway")]
struct Args {
    /// Configuration file, layered under TOLLBOOTH__* environment variables
    #[arg(short, long, env = "TOLLBOOTH_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    observability::init("tollbooth-server", &config.observability)?;
    let metrics = observability::metrics::install()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.storage.backend,
        "Starting Tollbooth Server"
    );

    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            tracing::info!("Connected to database, migrations applied");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, &config, metrics)?;
    bootstrap::seed(&config.bootstrap, &state.principals, &state.plans).await?;

    let app = api::build_router(state);

    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    observability::shutdown();
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
