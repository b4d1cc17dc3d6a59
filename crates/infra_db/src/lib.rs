//! Infrastructure Database Layer
//!
//! This crate persists subscriber accounts on PostgreSQL using SQLx.
//!
//! # Architecture
//!
//! `PgAccountStore` implements the domain's `AccountStore` port, so the
//! subscription service runs unchanged against PostgreSQL or the in-memory
//! store. Each unit of work is a transaction that holds the account row
//! with `SELECT ... FOR UPDATE` until commit.
//!
//! # Tables
//!
//! - `subscriber_accounts`: current account state
//! - `account_suspensions`: suspension periods, closed once
//! - `account_ledger_entries`, `account_payments`: append-only history
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgAccountStore};
//!
//! let pool = create_pool(&DatabaseConfig::new("postgres://localhost/subscribers")).await?;
//! run_migrations(&pool).await?;
//! let store = PgAccountStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::PgAccountStore;
