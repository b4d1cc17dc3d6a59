//! PostgreSQL pool and schema setup

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Shared PostgreSQL pool
pub type DatabasePool = PgPool;

/// Pool settings for the account store
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/subscribers")
///     .with_pool_size(1, 20)
///     .with_acquire_timeout(Duration::from_secs(5));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    /// Connections kept open while idle
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long a unit of work waits for a free connection
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_connections: 0,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Rejects pool bounds sqlx would otherwise accept and then stall on
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::ConnectionFailed` for an empty URL, a zero
    /// maximum, a minimum above the maximum, or a zero acquire timeout
    pub fn validate(&self) -> Result<(), DatabaseError> {
        let problem = if self.url.trim().is_empty() {
            Some("database url is empty".to_string())
        } else if self.max_connections == 0 {
            Some("max_connections must be at least 1".to_string())
        } else if self.min_connections > self.max_connections {
            Some(format!(
                "min_connections {} exceeds max_connections {}",
                self.min_connections, self.max_connections
            ))
        } else if self.acquire_timeout.is_zero() {
            Some("acquire timeout must be positive".to_string())
        } else {
            None
        };
        match problem {
            Some(message) => Err(DatabaseError::ConnectionFailed(message)),
            None => Ok(()),
        }
    }
}

/// Connects a pool after checking the settings
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` for invalid settings or an
/// unreachable server
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    config.validate()?;
    info!(
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        "Connecting account store pool"
    );

    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Applies the embedded migrations under `migrations/`
///
/// Already-applied migrations are skipped, so this runs on every startup.
///
/// # Errors
///
/// Returns `DatabaseError::MigrationFailed` if a migration cannot be applied
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!("Running database migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Migrations complete");
    Ok(())
}
