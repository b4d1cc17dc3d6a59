//! Subscription Domain - Billing & Lifecycle Engine
//!
//! This crate owns the rules for recurring-subscription accounts of a
//! telecom/cable provider: how months owed evolve, how a payment is applied
//! against debt, and how service is suspended, reactivated and cancelled
//! with an auditable history.
//!
//! # Components
//!
//! - **Account Ledger** (`account`, `ledger`): months owed, never negative;
//!   every change leaves a `LedgerEntry`
//! - **Payment Applier** (`payment`): settles an explicit number of months;
//!   months beyond the debt are recorded as advance
//! - **Lifecycle State Machine** (`lifecycle`): active, suspended, cancelled
//! - **Due-Date Scheduler** (`schedule`): pure calendar aggregation
//!
//! `SubscriptionService` runs each operation as a unit of work against an
//! `AccountStore`, serializing writers per account.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_subscription::{InMemoryAccountStore, SubscriptionService, BillingPolicy};
//!
//! let service = SubscriptionService::new(Arc::new(InMemoryAccountStore::new()), BillingPolicy::default());
//! let account = service.open_account(request).await?;
//! let applied = service.submit_payment(payment).await?;
//! assert_eq!(applied.payment.months_settled, 2);
//! ```

pub mod account;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod payment;
pub mod policy;
pub mod ports;
pub mod schedule;
pub mod service;

pub use account::{Account, AccountParts, OpenAccountRequest, ProfileUpdate, ServiceStatus};
pub use error::{ErrorKind, SubscriptionError};
pub use events::AccountEvent;
pub use ledger::{ApplyDeltaRequest, LedgerEntry, MONTHLY_CYCLE_REASON};
pub use lifecycle::{SuspendRequest, SuspensionEnd, SuspensionReason, SuspensionRecord};
pub use memory::InMemoryAccountStore;
pub use payment::{PaymentApplier, PaymentMethod, PaymentRecord, SubmitPaymentRequest};
pub use policy::{AdvancePolicy, AmountCheck, BillingPolicy, ReactivationPolicy};
pub use ports::{AccountLock, AccountQuery, AccountStore};
pub use schedule::{compute_due_date_buckets, CalendarBucket, DueDateCandidate};
pub use service::{DeltaApplied, PaymentApplied, SubscriptionService};
