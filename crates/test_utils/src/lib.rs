//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! subscriber billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built values for money, dates and operators
//! - `builders`: Builders for account, payment and suspension requests
//! - `database`: PostgreSQL test container management
//! - `assertions`: Invariant and history checks for accounts
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
