//! RentCar Server
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Connects to `PostgreSQL` and applies migrations
//! - Creates the bootstrap admin account when configured
//! - Starts the Prometheus exporter when enabled
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin rentcar-server
//! ```

use anyhow::Context;
use rentcar_auth::InMemoryBlocklist;
use rentcar_core::environment::SystemClock;
use rentcar_postgres::PgDatabase;
use rentcar_runtime::metrics::MetricsServer;
use rentcar_server::auth::setup::ensure_admin;
use rentcar_server::images::LocalImageStore;
use rentcar_server::{build_router, AppState, Config, Repositories};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentcar_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RentCar server...");

    let config = Config::from_env();
    tracing::info!(
        bind = %config.bind_address(),
        upload_dir = %config.storage.upload_dir.display(),
        "Configuration loaded"
    );
    if config.auth.uses_dev_secret() {
        tracing::warn!("TOKEN_SECRET is not set; using the development signing secret");
    }

    // Metrics exporter
    let _metrics = if config.server.metrics_enabled {
        let addr = config
            .metrics_address()
            .context("METRICS_HOST/METRICS_PORT do not form a socket address")?;
        let mut server = MetricsServer::new(addr);
        server.start().context("Failed to start metrics exporter")?;
        tracing::info!(%addr, "Metrics exporter listening");
        Some(server)
    } else {
        None
    };

    // Database
    let database = PgDatabase::connect(&config.database.url, &config.database.pool())
        .await
        .context("Failed to connect to PostgreSQL")?;
    database.migrate().await.context("Failed to apply migrations")?;
    let repos = Repositories::from_shared(Arc::new(database));

    // Images
    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.storage.upload_dir.display()))?;
    let images = LocalImageStore::new(&config.storage.upload_dir, &config.storage.public_path);

    // Accounts
    let auth = config.auth.auth_config();
    let state = AppState::new(
        repos,
        &auth,
        Arc::new(InMemoryBlocklist::new()),
        Arc::new(images),
        Arc::new(SystemClock),
    );
    if let Some(admin) = &config.auth.bootstrap_admin {
        if ensure_admin(state.users.as_ref(), state.hasher, admin).await? {
            tracing::info!(email = %admin.email, "Bootstrap admin created");
        }
    }

    let app = build_router(state, &config.server, &config.storage);
    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    tracing::info!(addr = %config.bind_address(), "RentCar server is running");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = drain_tx.send(());
    });

    tokio::select! {
        result = server.into_future() => result.context("HTTP server failed")?,
        () = async {
            let _ = drain_rx.await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!(?shutdown_timeout, "Connections still open after shutdown timeout");
        },
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(error) => {
                tracing::error!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down gracefully...");
}
