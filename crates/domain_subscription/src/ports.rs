//! Storage ports for the subscription domain
//!
//! The `AccountStore` trait is everything the service needs from persistence.
//! Mutations go through an `AccountLock`: a unit of work that holds the
//! account's single-writer gate from `lock` until `commit` or drop.
//!
//! # Adapters
//!
//! - `InMemoryAccountStore` (this crate): per-account mutex plus a
//!   read-write lock around the committed record
//! - `PgAccountStore` (infra_db): a transaction holding
//!   `SELECT ... FOR UPDATE` on the account row
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut lock = store.lock(account_id).await?;
//! let mut account = lock.account().clone();
//! account.suspend(&request)?;
//! let events = account.take_events();
//! lock.commit(&account, &events).await?;
//! ```

use async_trait::async_trait;

use core_kernel::AccountId;

use crate::account::{Account, ServiceStatus};
use crate::error::SubscriptionError;
use crate::events::AccountEvent;
use crate::ledger::LedgerEntry;
use crate::payment::PaymentRecord;

/// Query parameters for listing accounts
#[derive(Debug, Clone, Default)]
pub struct AccountQuery {
    /// Filter by service status
    pub status: Option<ServiceStatus>,
    /// Excludes cancelled accounts when no status filter is set
    pub exclude_cancelled: bool,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl AccountQuery {
    /// Creates a query for one status
    pub fn by_status(status: ServiceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Creates a query for accounts that are still billed
    pub fn billable() -> Self {
        Self {
            exclude_cancelled: true,
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Returns true if the account passes the status filters
    pub fn matches(&self, account: &Account) -> bool {
        match self.status {
            Some(status) => account.status() == status,
            None => !(self.exclude_cancelled && account.is_cancelled()),
        }
    }
}

/// A locked account awaiting commit
///
/// Holding the lock excludes every other writer of the same account.
/// Dropping it without calling `commit` discards all changes.
#[async_trait]
pub trait AccountLock: Send {
    /// The committed account state as of lock acquisition
    fn account(&self) -> &Account;

    /// Returns true if the receipt number is already used on this account
    async fn has_receipt(&mut self, receipt_number: &str) -> Result<bool, SubscriptionError>;

    /// Atomically stores the new account state and appends the history
    /// records carried by `events`, then releases the lock
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::DuplicateReceipt` if a payment event
    /// reuses a receipt, or `SubscriptionError::Storage` if the write fails.
    /// Nothing is stored on error.
    async fn commit(self: Box<Self>, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError>;
}

/// Persistence port for subscriber accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Stores a newly opened account with its opening history
    async fn create(&self, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError>;

    /// Returns the latest committed state
    ///
    /// # Returns
    ///
    /// The account if found, or `SubscriptionError::NotFound`
    async fn get(&self, id: AccountId) -> Result<Account, SubscriptionError>;

    /// Lists committed accounts matching the query, oldest first
    async fn list(&self, query: AccountQuery) -> Result<Vec<Account>, SubscriptionError>;

    /// Acquires the single-writer lock for an account
    ///
    /// Waits while another unit of work holds the same account; locks on
    /// different accounts never contend.
    async fn lock(&self, id: AccountId) -> Result<Box<dyn AccountLock>, SubscriptionError>;

    /// Ledger history, chronological
    async fn ledger_entries(&self, id: AccountId) -> Result<Vec<LedgerEntry>, SubscriptionError>;

    /// Payment history, chronological
    async fn payments(&self, id: AccountId) -> Result<Vec<PaymentRecord>, SubscriptionError>;

    /// Checks that the backing store is reachable
    async fn health_check(&self) -> Result<(), SubscriptionError>;
}
