//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for accounts and their history
//! that give more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_subscription::{Account, LedgerEntry, PaymentRecord, ServiceStatus};

/// Asserts that two Money values are equal in amount and currency
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected.amount()
    );
}

/// Asserts the structural account invariants
///
/// # Panics
///
/// Panics if status and open suspension records disagree, or if more than
/// one suspension is open
pub fn assert_account_invariants(account: &Account) {
    let open = account.suspensions().iter().filter(|r| r.is_open()).count();
    assert!(open <= 1, "Account {} has {} open suspensions", account.id(), open);
    assert_eq!(
        account.status() == ServiceStatus::Suspended,
        open == 1,
        "Account {} is {} with {} open suspensions",
        account.id(),
        account.status(),
        open
    );
    assert!(
        account.check_invariants().is_ok(),
        "Account {} fails its own invariant check",
        account.id()
    );
    assert_eq!(
        account.is_cancelled(),
        account.cancelled_at().is_some(),
        "Account {} cancellation stamp disagrees with status",
        account.id()
    );
}

/// Asserts that suspension records are chronological and closed in order
pub fn assert_suspensions_chronological(account: &Account) {
    let records = account.suspensions();
    for pair in records.windows(2) {
        assert!(
            pair[0].suspended_at <= pair[1].suspended_at,
            "Suspension {} starts after {}",
            pair[0].id,
            pair[1].id
        );
        assert!(
            !pair[0].is_open(),
            "Suspension {} is open but not the latest",
            pair[0].id
        );
    }
    for record in records {
        if let Some(end) = record.reactivated_at {
            assert!(end >= record.suspended_at, "Suspension {} ends before it starts", record.id);
        }
    }
}

/// Asserts that the ledger explains the account's months owed
///
/// Applied deltas sum to the current debt and the last entry's resulting
/// balance matches it.
pub fn assert_ledger_consistent(account: &Account, ledger: &[LedgerEntry]) {
    let total: i64 = ledger.iter().map(|e| i64::from(e.applied_delta)).sum();
    assert_eq!(
        total,
        i64::from(account.months_owed()),
        "Ledger of {} sums to {} but account owes {}",
        account.id(),
        total,
        account.months_owed()
    );
    if let Some(last) = ledger.last() {
        assert_eq!(
            last.resulting_months_owed,
            account.months_owed(),
            "Last ledger entry of {} disagrees with the account",
            account.id()
        );
    }
    for entry in ledger {
        assert_eq!(entry.account_id, account.id(), "Ledger entry {} belongs elsewhere", entry.id);
    }
}

/// Asserts that a payment splits into deducted debt and advance months
pub fn assert_payment_split(payment: &PaymentRecord) {
    assert_eq!(
        payment.months_deducted + payment.advance_months,
        payment.months_settled,
        "Payment {} splits {} + {} but settled {}",
        payment.receipt_number,
        payment.months_deducted,
        payment.advance_months,
        payment.months_settled
    );
    assert!(payment.amount.is_positive(), "Payment {} has no amount", payment.receipt_number);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{OpenAccountBuilder, SuspendBuilder};
    use crate::fixtures::MoneyFixtures;
    use domain_subscription::ReactivationPolicy;

    #[test]
    fn test_invariants_through_lifecycle() {
        let mut account = OpenAccountBuilder::new().with_months_owed(1).open();
        assert_account_invariants(&account);

        account.suspend(&SuspendBuilder::new().build()).unwrap();
        assert_account_invariants(&account);

        account.reactivate("Admin", ReactivationPolicy::AllowWithDebt).unwrap();
        account.suspend(&SuspendBuilder::new().build()).unwrap();
        account.cancel("Admin").unwrap();
        assert_account_invariants(&account);
        assert_suspensions_chronological(&account);
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_money_eq_catches_currency() {
        assert_money_eq(&MoneyFixtures::pen_50(), &MoneyFixtures::usd_20());
    }
}
