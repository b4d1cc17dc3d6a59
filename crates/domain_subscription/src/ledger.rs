//! Account ledger
//!
//! Every change to `months_owed` goes through `Account::apply_delta` (or the
//! payment applier, which shares the same arithmetic) and leaves a
//! `LedgerEntry` behind. Paid-down debt is clamped at zero; the overflow is
//! recorded as advance months on the entry and never stored as negative debt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, LedgerEntryId};

use crate::account::Account;
use crate::error::{require_text, SubscriptionError};
use crate::events::AccountEvent;
use crate::policy::AdvancePolicy;

/// Reason used by the external accrual trigger
pub const MONTHLY_CYCLE_REASON: &str = "monthly-cycle";

/// One append-only entry of an account's financial history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub account_id: AccountId,
    pub recorded_at: DateTime<Utc>,
    /// Delta as submitted
    pub requested_delta: i32,
    /// Change actually applied to months owed after clamping and credit
    pub applied_delta: i32,
    pub reason: String,
    pub actor: String,
    pub resulting_months_owed: u32,
    /// Months paid beyond the debt that existed
    pub advance_months: u32,
    /// Carried-forward credit that absorbed an accrual
    pub credit_applied: u32,
}

/// Request for a manual or scheduled ledger adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDeltaRequest {
    /// Positive means more owed, negative means paid down
    pub months_delta: i32,
    pub reason: String,
    pub actor: String,
}

impl ApplyDeltaRequest {
    /// The adjustment the accrual trigger submits once per elapsed cycle
    pub fn monthly_cycle(actor: impl Into<String>) -> Self {
        Self {
            months_delta: 1,
            reason: MONTHLY_CYCLE_REASON.to_string(),
            actor: actor.into(),
        }
    }
}

impl Account {
    /// Adjusts months owed and records a ledger entry
    ///
    /// A negative delta larger than the current debt leaves the account at
    /// zero and reports the excess as `advance_months` on the entry.
    ///
    /// # Arguments
    ///
    /// * `request` - Signed delta, reason and actor
    /// * `policy` - Whether advance months become carried credit
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::Validation` for a zero delta, an empty reason or
    ///   actor, or a result that would overflow
    /// - `SubscriptionError::InvalidState` if the account is cancelled
    pub fn apply_delta(
        &mut self,
        request: &ApplyDeltaRequest,
        policy: AdvancePolicy,
    ) -> Result<LedgerEntry, SubscriptionError> {
        if request.months_delta == 0 {
            return Err(SubscriptionError::validation("months_delta must not be zero"));
        }
        self.ensure_not_cancelled("apply ledger delta")?;

        let entry = self.record_delta(request.months_delta, &request.reason, &request.actor, policy)?;
        self.touch();
        self.push_event(AccountEvent::LedgerAdjusted(entry.clone()));
        Ok(entry)
    }

    /// Shifts months owed and builds the matching entry without stamping
    /// the account
    pub(crate) fn record_delta(
        &mut self,
        delta: i32,
        reason: &str,
        actor: &str,
        policy: AdvancePolicy,
    ) -> Result<LedgerEntry, SubscriptionError> {
        require_text("reason", reason)?;
        require_text("actor", actor)?;

        let shift = self.shift_months(i64::from(delta), policy)?;
        let applied_delta = i32::try_from(shift.applied)
            .map_err(|_| SubscriptionError::validation("applied delta out of range"))?;

        Ok(LedgerEntry {
            id: LedgerEntryId::new(),
            account_id: self.id(),
            recorded_at: Utc::now(),
            requested_delta: delta,
            applied_delta,
            reason: reason.trim().to_string(),
            actor: actor.trim().to_string(),
            resulting_months_owed: self.months_owed(),
            advance_months: shift.advance,
            credit_applied: shift.credit_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{OpenAccountRequest, ServiceStatus};
    use chrono::NaiveDate;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn account_owing(months: u32) -> Account {
        Account::open(OpenAccountRequest {
            holder_name: "Juan Mamani".to_string(),
            plan: None,
            monthly_price: dec!(50),
            currency: Currency::PEN,
            next_due_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            months_owed: months,
            actor: "Admin".to_string(),
        })
        .unwrap()
    }

    fn delta(months_delta: i32, reason: &str) -> ApplyDeltaRequest {
        ApplyDeltaRequest {
            months_delta,
            reason: reason.to_string(),
            actor: "Admin".to_string(),
        }
    }

    #[test]
    fn test_accrual_increments_debt() {
        let mut account = account_owing(0);
        let entry = account
            .apply_delta(&ApplyDeltaRequest::monthly_cycle("scheduler"), AdvancePolicy::Consume)
            .unwrap();

        assert_eq!(account.months_owed(), 1);
        assert_eq!(entry.requested_delta, 1);
        assert_eq!(entry.applied_delta, 1);
        assert_eq!(entry.resulting_months_owed, 1);
        assert_eq!(entry.reason, MONTHLY_CYCLE_REASON);
    }

    #[test]
    fn test_paydown_beyond_debt_clamps_and_records_advance() {
        let mut account = account_owing(2);
        let entry = account.apply_delta(&delta(-5, "manual settlement"), AdvancePolicy::Consume).unwrap();

        assert_eq!(account.months_owed(), 0);
        assert_eq!(entry.applied_delta, -2);
        assert_eq!(entry.advance_months, 3);
        assert_eq!(account.advance_months_consumed(), 3);
        assert_eq!(account.advance_credit_months(), 0);
    }

    #[test]
    fn test_carry_forward_absorbs_next_accrual() {
        let mut account = account_owing(1);
        account.apply_delta(&delta(-3, "prepaid"), AdvancePolicy::CarryForward).unwrap();
        assert_eq!(account.advance_credit_months(), 2);

        let entry = account
            .apply_delta(&ApplyDeltaRequest::monthly_cycle("scheduler"), AdvancePolicy::CarryForward)
            .unwrap();
        assert_eq!(entry.applied_delta, 0);
        assert_eq!(entry.credit_applied, 1);
        assert_eq!(account.months_owed(), 0);
        assert_eq!(account.advance_credit_months(), 1);
    }

    #[test]
    fn test_zero_delta_and_empty_reason_are_rejected() {
        let mut account = account_owing(1);
        assert!(matches!(
            account.apply_delta(&delta(0, "noop"), AdvancePolicy::Consume),
            Err(SubscriptionError::Validation(_))
        ));
        assert!(matches!(
            account.apply_delta(&delta(1, " "), AdvancePolicy::Consume),
            Err(SubscriptionError::Validation(_))
        ));
        assert_eq!(account.months_owed(), 1);
    }

    #[test]
    fn test_overflow_is_rejected_without_change() {
        let mut account = account_owing(1);
        let result = account.apply_delta(&delta(i32::MAX, "bulk"), AdvancePolicy::Consume);
        assert!(result.is_ok());
        let result = account.apply_delta(&delta(i32::MAX, "bulk"), AdvancePolicy::Consume);
        assert!(result.is_ok());
        let result = account.apply_delta(&delta(i32::MAX, "bulk"), AdvancePolicy::Consume);
        assert!(matches!(result, Err(SubscriptionError::Validation(_))));
        assert_eq!(account.months_owed(), 1 + 2 * (i32::MAX as u32));
    }

    #[test]
    fn test_cancelled_account_rejects_delta() {
        let mut account = account_owing(0);
        account.cancel("Admin").unwrap();
        assert_eq!(account.status(), ServiceStatus::Cancelled);
        assert!(matches!(
            account.apply_delta(&delta(1, "monthly-cycle"), AdvancePolicy::Consume),
            Err(SubscriptionError::InvalidState(_))
        ));
    }
}
