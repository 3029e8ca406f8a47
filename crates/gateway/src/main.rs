//! Pagemark API Gateway binary
//!
//! Loads configuration, connects the database and file store, then serves
//! the REST API until SIGINT or SIGTERM.

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use pagemark_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    metrics::{self, LATENCY_BUCKETS},
    storage::LocalPdfStore,
};
use pagemark_gateway::{create_router, AppState};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!("Starting Pagemark API Gateway v{}", pagemark_common::VERSION);

    let jwt_secret = config
        .auth
        .jwt_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret must be set (APP__AUTH__JWT_SECRET)".to_string(),
        })?;
    let jwt = Arc::new(JwtManager::new(jwt_secret, config.auth.jwt_expiration_secs));

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), LATENCY_BUCKETS)?
            .install()
            .context("Failed to install Prometheus exporter")?;
        metrics::register_metrics();
        info!("Metrics listening on {}", metrics_addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        db.ensure_schema().await?;
    }

    let store = LocalPdfStore::new(&config.storage.upload_dir).await?;
    info!(upload_dir = %config.storage.upload_dir.display(), "PDF storage ready");

    let config = Arc::new(config);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        store: Arc::new(store),
        jwt,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Listening on {}", listener.local_addr()?);

    let (draining_tx, draining_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();

    let shutdown_timeout = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            if draining_rx.await.is_ok() {
                tokio::time::sleep(shutdown_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(timeout_secs = shutdown_timeout.as_secs(), "Connections still open after shutdown timeout, exiting");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
