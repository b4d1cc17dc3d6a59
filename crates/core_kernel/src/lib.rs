//! Core Kernel - Foundational types for the subscriber billing system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise two-decimal currency arithmetic
//! - Inclusive calendar-day ranges used by due-date reporting
//! - Strongly-typed identifiers for accounts, payments and audit records

pub mod money;
pub mod temporal;
pub mod identifiers;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{DateRange, TemporalError};
pub use identifiers::{AccountId, PaymentId, SuspensionId, LedgerEntryId};
