//! In-memory account store
//!
//! Each account lives in its own slot: a writer mutex that a unit of work
//! holds from `lock` to commit, and a read-write lock around the committed
//! record. Readers only ever take the read lock, so they see the last
//! committed state and never a working copy. Slots of different accounts
//! share nothing but the index map, which is held only for lookups.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use core_kernel::AccountId;

use crate::account::Account;
use crate::error::SubscriptionError;
use crate::events::AccountEvent;
use crate::ledger::LedgerEntry;
use crate::payment::PaymentRecord;
use crate::ports::{AccountLock, AccountQuery, AccountStore};

#[derive(Debug)]
struct AccountRecord {
    account: Account,
    ledger: Vec<LedgerEntry>,
    payments: Vec<PaymentRecord>,
    receipts: HashSet<String>,
}

impl AccountRecord {
    fn new(account: &Account) -> Self {
        Self {
            account: account.clone(),
            ledger: Vec::new(),
            payments: Vec::new(),
            receipts: HashSet::new(),
        }
    }

    /// Appends history carried by events; checks everything before writing
    fn append(&mut self, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
        let mut incoming = HashSet::new();
        for event in events {
            if let AccountEvent::PaymentRecorded(payment) = event {
                let receipt = payment.receipt_number.as_str();
                if self.receipts.contains(receipt) || !incoming.insert(receipt) {
                    return Err(SubscriptionError::DuplicateReceipt {
                        account_id: payment.account_id.to_string(),
                        receipt_number: payment.receipt_number.clone(),
                    });
                }
            }
        }

        for event in events {
            match event {
                AccountEvent::LedgerAdjusted(entry) => self.ledger.push(entry.clone()),
                AccountEvent::PaymentRecorded(payment) => {
                    self.receipts.insert(payment.receipt_number.clone());
                    self.payments.push(payment.clone());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct AccountSlot {
    writer: Arc<Mutex<()>>,
    committed: RwLock<AccountRecord>,
}

/// Account store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Arc<AccountSlot>>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Returns true if no account is stored
    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn slot(&self, id: AccountId) -> Result<Arc<AccountSlot>, SubscriptionError> {
        self.accounts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| SubscriptionError::not_found(id))
    }
}

struct InMemoryLock {
    slot: Arc<AccountSlot>,
    snapshot: Account,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl AccountLock for InMemoryLock {
    fn account(&self) -> &Account {
        &self.snapshot
    }

    async fn has_receipt(&mut self, receipt_number: &str) -> Result<bool, SubscriptionError> {
        Ok(self.slot.committed.read().await.receipts.contains(receipt_number))
    }

    async fn commit(self: Box<Self>, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
        if account.id() != self.snapshot.id() {
            return Err(SubscriptionError::storage(format!(
                "lock for {} cannot commit {}",
                self.snapshot.id(),
                account.id()
            )));
        }

        let mut record = self.slot.committed.write().await;
        record.append(events)?;
        record.account = account.clone();
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
        let mut record = AccountRecord::new(account);
        record.append(events)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id()) {
            return Err(SubscriptionError::storage(format!("account {} already exists", account.id())));
        }
        accounts.insert(
            account.id(),
            Arc::new(AccountSlot {
                writer: Arc::new(Mutex::new(())),
                committed: RwLock::new(record),
            }),
        );
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Account, SubscriptionError> {
        let slot = self.slot(id).await?;
        let record = slot.committed.read().await;
        Ok(record.account.clone())
    }

    async fn list(&self, query: AccountQuery) -> Result<Vec<Account>, SubscriptionError> {
        let slots: Vec<Arc<AccountSlot>> = self.accounts.read().await.values().cloned().collect();

        let mut accounts = Vec::with_capacity(slots.len());
        for slot in slots {
            let record = slot.committed.read().await;
            if query.matches(&record.account) {
                accounts.push(record.account.clone());
            }
        }
        accounts.sort_by_key(|a| (a.opened_at(), a.id()));

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(accounts.into_iter().skip(offset).take(limit).collect())
    }

    async fn lock(&self, id: AccountId) -> Result<Box<dyn AccountLock>, SubscriptionError> {
        let slot = self.slot(id).await?;
        let writer = slot.writer.clone().lock_owned().await;
        let snapshot = slot.committed.read().await.account.clone();

        Ok(Box::new(InMemoryLock {
            slot,
            snapshot,
            _writer: writer,
        }))
    }

    async fn ledger_entries(&self, id: AccountId) -> Result<Vec<LedgerEntry>, SubscriptionError> {
        let slot = self.slot(id).await?;
        let record = slot.committed.read().await;
        Ok(record.ledger.clone())
    }

    async fn payments(&self, id: AccountId) -> Result<Vec<PaymentRecord>, SubscriptionError> {
        let slot = self.slot(id).await?;
        let record = slot.committed.read().await;
        Ok(record.payments.clone())
    }

    async fn health_check(&self) -> Result<(), SubscriptionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::OpenAccountRequest;
    use crate::lifecycle::SuspendRequest;
    use chrono::NaiveDate;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn open() -> Account {
        Account::open(OpenAccountRequest {
            holder_name: "Ana Torres".to_string(),
            plan: None,
            monthly_price: dec!(45),
            currency: Currency::PEN,
            next_due_date: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            months_owed: 2,
            actor: "Admin".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryAccountStore::new();
        let mut account = open();
        let events = account.take_events();
        store.create(&account, &events).await.unwrap();

        let loaded = store.get(account.id()).await.unwrap();
        assert_eq!(loaded.months_owed(), 2);
        assert_eq!(store.ledger_entries(account.id()).await.unwrap().len(), 1);
        assert!(matches!(store.get(AccountId::new()).await, Err(SubscriptionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dropped_lock_discards_changes() {
        let store = InMemoryAccountStore::new();
        let mut account = open();
        let events = account.take_events();
        store.create(&account, &events).await.unwrap();

        {
            let lock = store.lock(account.id()).await.unwrap();
            let mut working = lock.account().clone();
            working
                .suspend(&SuspendRequest {
                    reason: "No paga".to_string(),
                    notes: None,
                    actor: "Admin".to_string(),
                })
                .unwrap();
        }

        let loaded = store.get(account.id()).await.unwrap();
        assert!(loaded.suspensions().is_empty());
        assert!(store.lock(account.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let store = InMemoryAccountStore::new();
        for _ in 0..3 {
            let mut account = open();
            let events = account.take_events();
            store.create(&account, &events).await.unwrap();
        }
        let first = store.list(AccountQuery::default()).await.unwrap()[0].id();

        let lock = store.lock(first).await.unwrap();
        let mut working = lock.account().clone();
        working.cancel("Admin").unwrap();
        let events = working.take_events();
        lock.commit(&working, &events).await.unwrap();

        assert_eq!(store.list(AccountQuery::billable()).await.unwrap().len(), 2);
        assert_eq!(
            store
                .list(AccountQuery::by_status(crate::account::ServiceStatus::Cancelled))
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.list(AccountQuery::default().paginate(2, 2)).await.unwrap().len(), 1);
    }
}
