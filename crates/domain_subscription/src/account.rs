//! Account aggregate root
//!
//! The Account is the consistency boundary for one subscriber's billing
//! relationship. Ledger adjustments, payments and lifecycle transitions all
//! mutate it through methods that preserve its invariants.
//!
//! # Invariants
//!
//! - `months_owed` is never negative (enforced by its unsigned type and by
//!   clamping paid-down deltas at zero)
//! - `status == Suspended` iff exactly one suspension record is open
//! - Cancelled is terminal

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountId, Currency, Money};

use crate::error::{require_text, SubscriptionError};
use crate::events::AccountEvent;
use crate::lifecycle::SuspensionRecord;
use crate::policy::AdvancePolicy;

/// Service status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Service is being provided
    Active,
    /// Service is halted; debt is not forgiven
    Suspended,
    /// Terminal; the account is kept for history
    Cancelled,
}

impl ServiceStatus {
    /// Stable lowercase name, also used as the persisted value
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Active => "active",
            ServiceStatus::Suspended => "suspended",
            ServiceStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from this one
    ///
    /// | From      | To                    |
    /// |-----------|-----------------------|
    /// | Active    | Suspended, Cancelled  |
    /// | Suspended | Active, Cancelled     |
    /// | Cancelled | (none)                |
    pub fn allowed_transitions(&self) -> &'static [ServiceStatus] {
        match self {
            ServiceStatus::Active => &[ServiceStatus::Suspended, ServiceStatus::Cancelled],
            ServiceStatus::Suspended => &[ServiceStatus::Active, ServiceStatus::Cancelled],
            ServiceStatus::Cancelled => &[],
        }
    }

    /// Returns true if the transition is allowed
    pub fn can_transition_to(&self, target: ServiceStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Validates a transition, failing with `InvalidTransition`
    pub fn validate_transition(&self, target: ServiceStatus) -> Result<(), SubscriptionError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(SubscriptionError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ServiceStatus::Active),
            "suspended" => Ok(ServiceStatus::Suspended),
            "cancelled" => Ok(ServiceStatus::Cancelled),
            other => Err(SubscriptionError::validation(format!("unknown status: {}", other))),
        }
    }
}

/// Request to open a new subscriber account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub holder_name: String,
    pub plan: Option<String>,
    pub monthly_price: Decimal,
    pub currency: Currency,
    pub next_due_date: NaiveDate,
    /// Debt carried over from before the account was registered
    #[serde(default)]
    pub months_owed: u32,
    pub actor: String,
}

/// Profile changes; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub holder_name: Option<String>,
    pub plan: Option<String>,
    pub monthly_price: Option<Decimal>,
    pub next_due_date: Option<NaiveDate>,
    pub actor: String,
}

impl ProfileUpdate {
    /// Returns true if the update carries no field changes
    pub fn is_empty(&self) -> bool {
        self.holder_name.is_none()
            && self.plan.is_none()
            && self.monthly_price.is_none()
            && self.next_due_date.is_none()
    }
}

/// Stored account state used to rebuild an aggregate from persistence
#[derive(Debug, Clone)]
pub struct AccountParts {
    pub id: AccountId,
    pub holder_name: String,
    pub plan: Option<String>,
    pub monthly_price: Money,
    pub months_owed: u32,
    pub advance_months_consumed: u32,
    pub advance_credit_months: u32,
    pub status: ServiceStatus,
    pub next_due_date: NaiveDate,
    pub suspensions: Vec<SuspensionRecord>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub version: u32,
}

/// Months moved by a single ledger adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonthsShift {
    /// Signed change actually applied to `months_owed`
    pub applied: i64,
    /// Months paid beyond the existing debt
    pub advance: u32,
    /// Carried-forward credit drawn down instead of accruing debt
    pub credit_used: u32,
}

/// The subscriber account aggregate root
///
/// Serialize only; stored state comes back through [`Account::restore`].
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    id: AccountId,
    holder_name: String,
    plan: Option<String>,
    monthly_price: Money,
    months_owed: u32,
    /// Cumulative months paid beyond existing debt
    advance_months_consumed: u32,
    /// Outstanding credit, only used under `AdvancePolicy::CarryForward`
    advance_credit_months: u32,
    status: ServiceStatus,
    next_due_date: NaiveDate,
    /// Append-only, chronological
    suspensions: Vec<SuspensionRecord>,
    opened_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<String>,
    /// Incremented once per committed mutation
    version: u32,
    #[serde(skip)]
    events: Vec<AccountEvent>,
}

impl Account {
    /// Opens a new active account
    ///
    /// # Arguments
    ///
    /// * `request` - Holder, pricing and initial debt
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Validation` if the holder name or actor is
    /// empty, or the price is negative or carries more than two decimals
    pub fn open(request: OpenAccountRequest) -> Result<Self, SubscriptionError> {
        require_text("holder_name", &request.holder_name)?;
        require_text("actor", &request.actor)?;
        let monthly_price = validate_price(request.monthly_price, request.currency)?;

        let now = Utc::now();
        let mut account = Self {
            id: AccountId::new(),
            holder_name: request.holder_name.trim().to_string(),
            plan: request.plan.filter(|p| !p.trim().is_empty()),
            monthly_price,
            months_owed: 0,
            advance_months_consumed: 0,
            advance_credit_months: 0,
            status: ServiceStatus::Active,
            next_due_date: request.next_due_date,
            suspensions: Vec::new(),
            opened_at: now,
            updated_at: now,
            cancelled_at: None,
            cancelled_by: None,
            version: 1,
            events: Vec::new(),
        };

        account.events.push(AccountEvent::AccountOpened {
            account_id: account.id,
            holder_name: account.holder_name.clone(),
            monthly_price,
            actor: request.actor.clone(),
            timestamp: now,
        });

        if request.months_owed > 0 {
            let delta = i32::try_from(request.months_owed)
                .map_err(|_| SubscriptionError::validation("opening balance is too large"))?;
            let entry = account.record_delta(delta, "opening-balance", &request.actor, AdvancePolicy::Consume)?;
            account.events.push(AccountEvent::LedgerAdjusted(entry));
        }

        Ok(account)
    }

    /// Rebuilds an account from stored state, checking its invariants
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Storage` if the stored suspension records
    /// contradict the stored status
    pub fn restore(parts: AccountParts) -> Result<Self, SubscriptionError> {
        let account = Self {
            id: parts.id,
            holder_name: parts.holder_name,
            plan: parts.plan,
            monthly_price: parts.monthly_price,
            months_owed: parts.months_owed,
            advance_months_consumed: parts.advance_months_consumed,
            advance_credit_months: parts.advance_credit_months,
            status: parts.status,
            next_due_date: parts.next_due_date,
            suspensions: parts.suspensions,
            opened_at: parts.opened_at,
            updated_at: parts.updated_at,
            cancelled_at: parts.cancelled_at,
            cancelled_by: parts.cancelled_by,
            version: parts.version,
            events: Vec::new(),
        };
        account.check_invariants().map_err(|e| {
            SubscriptionError::storage(format!("stored account {} is inconsistent: {}", account.id, e))
        })?;
        Ok(account)
    }

    /// Returns the account ID
    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the holder's display name
    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    /// Returns the plan label
    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    /// Returns the monthly price
    pub fn monthly_price(&self) -> Money {
        self.monthly_price
    }

    /// Returns the account currency
    pub fn currency(&self) -> Currency {
        self.monthly_price.currency()
    }

    /// Returns the number of unpaid monthly cycles
    pub fn months_owed(&self) -> u32 {
        self.months_owed
    }

    /// Returns the outstanding debt in money
    pub fn amount_owed(&self) -> Result<Money, SubscriptionError> {
        Ok(self.monthly_price.times(self.months_owed)?)
    }

    /// Returns the cumulative months paid beyond existing debt
    pub fn advance_months_consumed(&self) -> u32 {
        self.advance_months_consumed
    }

    /// Returns the carried-forward credit in months
    pub fn advance_credit_months(&self) -> u32 {
        self.advance_credit_months
    }

    /// Returns the service status
    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    /// Returns the next billing cycle date
    pub fn next_due_date(&self) -> NaiveDate {
        self.next_due_date
    }

    /// Returns the suspension history in chronological order
    pub fn suspensions(&self) -> &[SuspensionRecord] {
        &self.suspensions
    }

    /// Returns the open suspension record, if any
    pub fn open_suspension(&self) -> Option<&SuspensionRecord> {
        self.suspensions.iter().rev().find(|r| r.is_open())
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancelled_by(&self) -> Option<&str> {
        self.cancelled_by.as_deref()
    }

    /// Returns the version for optimistic checks and auditing
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Checks if the account is cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, ServiceStatus::Cancelled)
    }

    /// Returns accumulated domain events and clears them
    pub fn take_events(&mut self) -> Vec<AccountEvent> {
        std::mem::take(&mut self.events)
    }

    /// Applies profile changes
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::InvalidState` on a cancelled account and
    /// `SubscriptionError::Validation` for an empty update, empty actor or
    /// invalid price
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), SubscriptionError> {
        require_text("actor", &update.actor)?;
        if update.is_empty() {
            return Err(SubscriptionError::validation("profile update has no changes"));
        }
        self.ensure_not_cancelled("update profile")?;

        let monthly_price = match update.monthly_price {
            Some(price) => validate_price(price, self.currency())?,
            None => self.monthly_price,
        };
        let holder_name = match update.holder_name {
            Some(name) => {
                require_text("holder_name", &name)?;
                name.trim().to_string()
            }
            None => self.holder_name.clone(),
        };

        self.holder_name = holder_name;
        self.monthly_price = monthly_price;
        if let Some(plan) = update.plan {
            self.plan = Some(plan).filter(|p| !p.trim().is_empty());
        }
        if let Some(next_due_date) = update.next_due_date {
            self.next_due_date = next_due_date;
        }

        let now = self.touch();
        self.events.push(AccountEvent::ProfileUpdated {
            account_id: self.id,
            monthly_price: self.monthly_price,
            plan: self.plan.clone(),
            next_due_date: self.next_due_date,
            actor: update.actor,
            timestamp: now,
        });
        Ok(())
    }

    /// Verifies the structural invariants
    pub fn check_invariants(&self) -> Result<(), SubscriptionError> {
        let open = self.suspensions.iter().filter(|r| r.is_open()).count();
        match (self.status, open) {
            (ServiceStatus::Suspended, 1) => Ok(()),
            (ServiceStatus::Active | ServiceStatus::Cancelled, 0) => Ok(()),
            (status, open) => Err(SubscriptionError::invalid_state(format!(
                "status {} with {} open suspension records",
                status, open
            ))),
        }
    }

    pub(crate) fn ensure_not_cancelled(&self, operation: &str) -> Result<(), SubscriptionError> {
        if self.is_cancelled() {
            return Err(SubscriptionError::invalid_state(format!(
                "cannot {} on cancelled account {}",
                operation, self.id
            )));
        }
        Ok(())
    }

    /// Moves `months_owed` by `delta`, clamping paid-down debt at zero
    pub(crate) fn shift_months(
        &mut self,
        delta: i64,
        policy: AdvancePolicy,
    ) -> Result<MonthsShift, SubscriptionError> {
        let overflow = || SubscriptionError::validation("months owed would overflow");

        if delta >= 0 {
            let mut accrue = u32::try_from(delta).map_err(|_| overflow())?;
            let credit_used = match policy {
                AdvancePolicy::CarryForward => accrue.min(self.advance_credit_months),
                AdvancePolicy::Consume => 0,
            };
            accrue -= credit_used;
            let months_owed = self.months_owed.checked_add(accrue).ok_or_else(overflow)?;

            self.months_owed = months_owed;
            self.advance_credit_months -= credit_used;
            Ok(MonthsShift {
                applied: i64::from(accrue),
                advance: 0,
                credit_used,
            })
        } else {
            let paid = u32::try_from(delta.unsigned_abs()).map_err(|_| overflow())?;
            let deducted = paid.min(self.months_owed);
            let advance = paid - deducted;
            let consumed = self
                .advance_months_consumed
                .checked_add(advance)
                .ok_or_else(overflow)?;
            let credit = match policy {
                AdvancePolicy::CarryForward => self
                    .advance_credit_months
                    .checked_add(advance)
                    .ok_or_else(overflow)?,
                AdvancePolicy::Consume => self.advance_credit_months,
            };

            self.months_owed -= deducted;
            self.advance_months_consumed = consumed;
            self.advance_credit_months = credit;
            Ok(MonthsShift {
                applied: -i64::from(deducted),
                advance,
                credit_used: 0,
            })
        }
    }

    pub(crate) fn set_status(&mut self, status: ServiceStatus) {
        self.status = status;
    }

    pub(crate) fn push_suspension(&mut self, record: SuspensionRecord) {
        self.suspensions.push(record);
    }

    pub(crate) fn open_suspension_mut(&mut self) -> Option<&mut SuspensionRecord> {
        self.suspensions.iter_mut().rev().find(|r| r.is_open())
    }

    pub(crate) fn mark_cancelled(&mut self, actor: &str, at: DateTime<Utc>) {
        self.status = ServiceStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancelled_by = Some(actor.to_string());
    }

    pub(crate) fn push_event(&mut self, event: AccountEvent) {
        self.events.push(event);
    }

    /// Stamps a committed mutation; returns the mutation time
    pub(crate) fn touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.updated_at = now;
        self.version = self.version.saturating_add(1);
        now
    }
}

fn validate_price(amount: Decimal, currency: Currency) -> Result<Money, SubscriptionError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SubscriptionError::validation("monthly price must not be negative"));
    }
    Ok(Money::exact(amount, currency)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(months_owed: u32) -> OpenAccountRequest {
        OpenAccountRequest {
            holder_name: "Rosa Quispe".to_string(),
            plan: Some("Cable + Internet 60 Mbps".to_string()),
            monthly_price: dec!(50),
            currency: Currency::PEN,
            next_due_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            months_owed,
            actor: "Admin".to_string(),
        }
    }

    #[test]
    fn test_open_account_is_active_and_current() {
        let mut account = Account::open(request(0)).unwrap();
        assert_eq!(account.status(), ServiceStatus::Active);
        assert_eq!(account.months_owed(), 0);
        assert_eq!(account.version(), 1);
        assert!(account.suspensions().is_empty());

        let events = account.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AccountEvent::AccountOpened { .. }));
    }

    #[test]
    fn test_opening_balance_is_recorded_in_ledger() {
        let mut account = Account::open(request(3)).unwrap();
        assert_eq!(account.months_owed(), 3);
        assert_eq!(account.amount_owed().unwrap().amount(), dec!(150));

        let events = account.take_events();
        assert!(matches!(
            &events[1],
            AccountEvent::LedgerAdjusted(entry) if entry.reason == "opening-balance" && entry.resulting_months_owed == 3
        ));
    }

    #[test]
    fn test_open_rejects_bad_input() {
        let mut negative = request(0);
        negative.monthly_price = dec!(-1);
        assert!(matches!(Account::open(negative), Err(SubscriptionError::Validation(_))));

        let mut fractional = request(0);
        fractional.monthly_price = dec!(49.999);
        assert!(matches!(Account::open(fractional), Err(SubscriptionError::Validation(_))));

        let mut anonymous = request(0);
        anonymous.actor = "  ".to_string();
        assert!(matches!(Account::open(anonymous), Err(SubscriptionError::Validation(_))));
    }

    #[test]
    fn test_transition_table() {
        assert!(ServiceStatus::Active.can_transition_to(ServiceStatus::Suspended));
        assert!(ServiceStatus::Suspended.can_transition_to(ServiceStatus::Active));
        assert!(ServiceStatus::Suspended.can_transition_to(ServiceStatus::Cancelled));
        assert!(!ServiceStatus::Active.can_transition_to(ServiceStatus::Active));
        assert!(ServiceStatus::Cancelled.allowed_transitions().is_empty());
    }

    #[test]
    fn test_update_profile_changes_price() {
        let mut account = Account::open(request(2)).unwrap();
        account
            .update_profile(ProfileUpdate {
                monthly_price: Some(dec!(70)),
                actor: "Admin".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(account.monthly_price().amount(), dec!(70));
        assert_eq!(account.months_owed(), 2);
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn test_empty_profile_update_is_rejected() {
        let mut account = Account::open(request(0)).unwrap();
        let result = account.update_profile(ProfileUpdate {
            actor: "Admin".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SubscriptionError::Validation(_))));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Suspended".parse::<ServiceStatus>().unwrap(), ServiceStatus::Suspended);
        assert!("paused".parse::<ServiceStatus>().is_err());
    }

    #[test]
    fn test_restore_checks_stored_state() {
        let opened = Account::open(request(1)).unwrap();
        let parts = |status| AccountParts {
            id: opened.id(),
            holder_name: opened.holder_name().to_string(),
            plan: None,
            monthly_price: opened.monthly_price(),
            months_owed: 1,
            advance_months_consumed: 0,
            advance_credit_months: 0,
            status,
            next_due_date: opened.next_due_date(),
            suspensions: Vec::new(),
            opened_at: opened.opened_at(),
            updated_at: opened.opened_at(),
            cancelled_at: None,
            cancelled_by: None,
            version: 3,
        };

        let restored = Account::restore(parts(ServiceStatus::Active)).unwrap();
        assert_eq!(restored.version(), 3);
        assert_eq!(restored.months_owed(), 1);

        let orphaned = Account::restore(parts(ServiceStatus::Suspended));
        assert!(matches!(orphaned, Err(SubscriptionError::Storage(_))));
    }
}
