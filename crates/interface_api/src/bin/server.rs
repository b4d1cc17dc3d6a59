//! Subscriber Billing - API Server Binary
//!
//! This binary starts the HTTP API server for subscriber accounts.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration (in-memory store)
//! cargo run --bin subscriber-billing-api
//!
//! # Run against PostgreSQL
//! API_STORAGE=postgres API_DATABASE_URL=postgres://... cargo run --bin subscriber-billing-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_STORAGE` - `memory` or `postgres` (default: memory)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_MIN_CONNECTIONS` - Idle connections kept open (default: 0)
//! * `API_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_ACQUIRE_TIMEOUT_SECS` - Wait for a pooled connection (default: 30)
//! * `API_ADVANCE_POLICY` - `consume` or `carry_forward`
//! * `API_REACTIVATION_POLICY` - `allow_with_debt` or `block_while_owing`
//! * `API_AMOUNT_CHECK` - `exact`, `at_least` or `unchecked`
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_subscription::{AccountStore, InMemoryAccountStore, SubscriptionService};
use infra_db::{create_pool, run_migrations, PgAccountStore};
use interface_api::{
    config::{ApiConfig, StorageBackend},
    create_router,
};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, opens the account store,
/// and starts the HTTP server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The database is unreachable or migrations fail
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        "Starting Subscriber Billing API Server"
    );

    let store = open_store(&config).await?;
    let service = SubscriptionService::new(store, config.billing_policy());

    let app = create_router(service);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Opens the configured account store, migrating PostgreSQL first
async fn open_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn AccountStore>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory account store; state is lost on restart");
            Ok(Arc::new(InMemoryAccountStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database())
                .await
                .context("connecting to database")?;
            run_migrations(&pool).await.context("running migrations")?;
            Ok(Arc::new(PgAccountStore::new(pool)))
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits. If a handler
/// cannot be installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
