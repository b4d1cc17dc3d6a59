//! API configuration

use serde::Deserialize;
use std::time::Duration;

use domain_subscription::{AdvancePolicy, AmountCheck, BillingPolicy, ReactivationPolicy};
use infra_db::DatabaseConfig;

/// Where account state is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; state is lost on restart
    #[default]
    Memory,
    /// PostgreSQL via `database_url`
    Postgres,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Account storage backend
    pub storage: StorageBackend,
    /// Database URL, used when `storage` is `postgres`
    pub database_url: String,
    /// Pooled database connections kept open while idle
    pub min_connections: u32,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Seconds a request waits for a pooled connection
    pub acquire_timeout_secs: u64,
    /// How paid-ahead months interact with later accruals
    pub advance_policy: AdvancePolicy,
    /// Whether a suspended account may be reactivated while it still owes
    pub reactivation_policy: ReactivationPolicy,
    /// How a payment amount is checked against price times months
    pub amount_check: AmountCheck,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            storage: StorageBackend::Memory,
            database_url: "postgres://localhost/subscribers".to_string(),
            min_connections: 0,
            max_connections: 10,
            acquire_timeout_secs: 30,
            advance_policy: AdvancePolicy::default(),
            reactivation_policy: ReactivationPolicy::default(),
            amount_check: AmountCheck::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_`-prefixed environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for the PostgreSQL backend
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url)
            .with_pool_size(self.min_connections, self.max_connections)
            .with_acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    /// Billing rules handed to the subscription service
    pub fn billing_policy(&self) -> BillingPolicy {
        BillingPolicy::default()
            .with_advance(self.advance_policy)
            .with_reactivation(self.reactivation_policy)
            .with_amount_check(self.amount_check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.billing_policy(), BillingPolicy::default());
        assert!(config.database().validate().is_ok());
    }

    #[test]
    fn test_pool_settings_reach_database_config() {
        let config: ApiConfig = config::Config::builder()
            .set_override("database_url", "postgres://db/billing")
            .unwrap()
            .set_override("min_connections", 2)
            .unwrap()
            .set_override("max_connections", 8)
            .unwrap()
            .set_override("acquire_timeout_secs", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let database = config.database();
        assert_eq!(database.url, "postgres://db/billing");
        assert_eq!(database.min_connections, 2);
        assert_eq!(database.max_connections, 8);
        assert_eq!(database.acquire_timeout, Duration::from_secs(5));

        let inverted = ApiConfig {
            min_connections: 9,
            ..config
        };
        assert!(inverted.database().validate().is_err());
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("storage", "postgres")
            .unwrap()
            .set_override("reactivation_policy", "block_while_owing")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(
            config.billing_policy().reactivation,
            ReactivationPolicy::BlockWhileOwing
        );
        assert_eq!(config.billing_policy().advance, AdvancePolicy::Consume);
    }
}
