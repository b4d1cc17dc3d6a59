//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL queries and map between database rows and
//! domain types.
//!
//! # Architecture
//!
//! Each repository follows these principles:
//! - Runtime-checked queries with explicit row types
//! - One transaction per unit of work
//! - Row locks, not application mutexes, serialize writers

pub mod accounts;

pub use accounts::{PgAccountLock, PgAccountStore};
