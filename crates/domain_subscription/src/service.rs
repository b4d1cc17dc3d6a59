//! Subscription application service
//!
//! Runs each operation as one unit of work: lock the account, apply the
//! domain transition to a working copy, commit state and history together,
//! then log the emitted events. An error at any step drops the lock and
//! leaves the stored account untouched.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{AccountId, DateRange};

use crate::account::{Account, OpenAccountRequest, ProfileUpdate};
use crate::error::SubscriptionError;
use crate::events::AccountEvent;
use crate::ledger::{ApplyDeltaRequest, LedgerEntry};
use crate::lifecycle::{SuspendRequest, SuspensionRecord};
use crate::payment::{PaymentApplier, PaymentRecord, SubmitPaymentRequest};
use crate::policy::BillingPolicy;
use crate::ports::{AccountQuery, AccountStore};
use crate::schedule::{compute_due_date_buckets, CalendarBucket, DueDateCandidate};

/// Result of a ledger adjustment
#[derive(Debug, Clone)]
pub struct DeltaApplied {
    pub account: Account,
    pub entry: LedgerEntry,
}

/// Result of an applied payment
#[derive(Debug, Clone)]
pub struct PaymentApplied {
    pub account: Account,
    pub payment: PaymentRecord,
}

/// Entry point for every account operation
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn AccountStore>,
    policy: BillingPolicy,
}

impl SubscriptionService {
    /// Creates a service over a store with the given policies
    pub fn new(store: Arc<dyn AccountStore>, policy: BillingPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the active billing policy
    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Returns the underlying store
    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Opens a subscriber account
    #[instrument(skip(self, request), fields(holder = %request.holder_name))]
    pub async fn open_account(&self, request: OpenAccountRequest) -> Result<Account, SubscriptionError> {
        let mut account = Account::open(request).inspect_err(|e| rejected("open_account", e))?;
        let events = account.take_events();
        self.store.create(&account, &events).await?;
        log_events(&events);
        Ok(account)
    }

    /// Returns the latest committed account state
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn get_state(&self, id: AccountId) -> Result<Account, SubscriptionError> {
        self.store.get(id).await
    }

    /// Lists accounts for reporting
    #[instrument(skip(self))]
    pub async fn list_accounts(&self, query: AccountQuery) -> Result<Vec<Account>, SubscriptionError> {
        self.store.list(query).await
    }

    /// Changes price, plan, holder or due date
    #[instrument(skip(self, update), fields(account_id = %id, actor = %update.actor))]
    pub async fn update_profile(&self, id: AccountId, update: ProfileUpdate) -> Result<Account, SubscriptionError> {
        let (account, ()) = self
            .mutate(id, "update_profile", move |account| account.update_profile(update))
            .await?;
        Ok(account)
    }

    /// Adjusts months owed; the accrual trigger calls this with `+1`
    #[instrument(skip(self, request), fields(account_id = %id, delta = request.months_delta))]
    pub async fn apply_delta(&self, id: AccountId, request: ApplyDeltaRequest) -> Result<DeltaApplied, SubscriptionError> {
        let advance = self.policy.advance;
        let (account, entry) = self
            .mutate(id, "apply_delta", move |account| account.apply_delta(&request, advance))
            .await?;
        Ok(DeltaApplied { account, entry })
    }

    /// Applies a payment
    ///
    /// Input is validated before the account is locked. A receipt number
    /// already used on the account fails with `DuplicateReceipt` and changes
    /// nothing.
    #[instrument(
        skip(self, request),
        fields(account_id = %request.account_id, receipt = %request.receipt_number, months = request.months_settled)
    )]
    pub async fn submit_payment(&self, request: SubmitPaymentRequest) -> Result<PaymentApplied, SubscriptionError> {
        request.validate().inspect_err(|e| rejected("submit_payment", e))?;

        let mut lock = self.store.lock(request.account_id).await?;
        let receipt = request.normalized_receipt();
        if lock.has_receipt(receipt).await? {
            let err = SubscriptionError::DuplicateReceipt {
                account_id: request.account_id.to_string(),
                receipt_number: receipt.to_string(),
            };
            rejected("submit_payment", &err);
            return Err(err);
        }

        let mut account = lock.account().clone();
        let payment = PaymentApplier::new(self.policy)
            .apply(&mut account, &request)
            .inspect_err(|e| rejected("submit_payment", e))?;

        let events = account.take_events();
        lock.commit(&account, &events).await?;
        log_events(&events);
        Ok(PaymentApplied { account, payment })
    }

    /// Suspends service
    #[instrument(skip(self, request), fields(account_id = %id, actor = %request.actor))]
    pub async fn suspend(&self, id: AccountId, request: SuspendRequest) -> Result<Account, SubscriptionError> {
        let (account, _) = self
            .mutate(id, "suspend", move |account| account.suspend(&request))
            .await?;
        Ok(account)
    }

    /// Reactivates a suspended account
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn reactivate(&self, id: AccountId, actor: &str) -> Result<Account, SubscriptionError> {
        let policy = self.policy.reactivation;
        let actor = actor.to_string();
        let (account, _) = self
            .mutate(id, "reactivate", move |account| account.reactivate(&actor, policy))
            .await?;
        Ok(account)
    }

    /// Cancels an account; terminal
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn cancel(&self, id: AccountId, actor: &str) -> Result<Account, SubscriptionError> {
        let actor = actor.to_string();
        let (account, _) = self
            .mutate(id, "cancel", move |account| account.cancel(&actor))
            .await?;
        Ok(account)
    }

    /// Suspension records in chronological order, at most one open
    pub async fn suspension_history(&self, id: AccountId) -> Result<Vec<SuspensionRecord>, SubscriptionError> {
        Ok(self.store.get(id).await?.suspensions().to_vec())
    }

    /// Payments in the order they were applied
    pub async fn payment_history(&self, id: AccountId) -> Result<Vec<PaymentRecord>, SubscriptionError> {
        self.store.payments(id).await
    }

    /// Ledger entries in the order they were recorded
    pub async fn ledger_history(&self, id: AccountId) -> Result<Vec<LedgerEntry>, SubscriptionError> {
        self.store.ledger_entries(id).await
    }

    /// Buckets every billable account by due day within `[from, to]`
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Validation` if `from` is after `to`
    #[instrument(skip(self))]
    pub async fn compute_due_date_buckets(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, CalendarBucket>, SubscriptionError> {
        let range = DateRange::new(from, to)?;
        let candidates: Vec<DueDateCandidate> = self
            .store
            .list(AccountQuery::billable())
            .await?
            .iter()
            .map(DueDateCandidate::from)
            .collect();
        compute_due_date_buckets(&candidates, range)
    }

    /// Checks that the store is reachable
    pub async fn health_check(&self) -> Result<(), SubscriptionError> {
        self.store.health_check().await
    }

    async fn mutate<T, F>(&self, id: AccountId, operation: &'static str, apply: F) -> Result<(Account, T), SubscriptionError>
    where
        F: FnOnce(&mut Account) -> Result<T, SubscriptionError>,
    {
        let lock = self.store.lock(id).await?;
        let mut account = lock.account().clone();
        let outcome = apply(&mut account).inspect_err(|e| rejected(operation, e))?;

        let events = account.take_events();
        lock.commit(&account, &events).await?;
        log_events(&events);
        Ok((account, outcome))
    }
}

fn rejected(operation: &str, error: &SubscriptionError) {
    warn!(operation, kind = error.kind().as_str(), %error, "Operation rejected");
}

fn log_events(events: &[AccountEvent]) {
    for event in events {
        info!(
            event = event.event_type(),
            account_id = %event.account_id(),
            at = %event.timestamp(),
            "Account event committed"
        );
    }
}
