//! Due-date scheduler
//!
//! A pure aggregation of accounts by the calendar day of their next due date.
//! It reads a snapshot and touches nothing, so it can run concurrently over
//! any split of accounts or ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{AccountId, DateRange, Money};

use crate::account::Account;
use crate::error::SubscriptionError;

/// Read-only view of an account as the scheduler needs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateCandidate {
    pub account_id: AccountId,
    pub next_due_date: NaiveDate,
    pub monthly_price: Money,
    pub holder_name: String,
}

impl From<&Account> for DueDateCandidate {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id(),
            next_due_date: account.next_due_date(),
            monthly_price: account.monthly_price(),
            holder_name: account.holder_name().to_string(),
        }
    }
}

/// Accounts due on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarBucket {
    pub date: NaiveDate,
    pub accounts: Vec<DueDateCandidate>,
    pub count: usize,
    pub total_amount_due: Money,
}

/// Groups candidates by due day within an inclusive range
///
/// Days without accounts are absent from the result. Candidates outside the
/// range are dropped, not clamped. Within a bucket candidates keep their
/// input order.
///
/// # Errors
///
/// Returns `SubscriptionError::Validation` if candidates sharing a day are
/// priced in different currencies
///
/// # Example
///
/// ```rust,ignore
/// let buckets = compute_due_date_buckets(&candidates, DateRange::month(2024, 6)?)?;
/// for (day, bucket) in &buckets {
///     println!("{day}: {} accounts, {}", bucket.count, bucket.total_amount_due);
/// }
/// ```
pub fn compute_due_date_buckets<'a, I>(
    candidates: I,
    range: DateRange,
) -> Result<BTreeMap<NaiveDate, CalendarBucket>, SubscriptionError>
where
    I: IntoIterator<Item = &'a DueDateCandidate>,
{
    let mut grouped: BTreeMap<NaiveDate, Vec<DueDateCandidate>> = BTreeMap::new();
    for candidate in candidates {
        if range.contains(candidate.next_due_date) {
            grouped
                .entry(candidate.next_due_date)
                .or_default()
                .push(candidate.clone());
        }
    }

    grouped
        .into_iter()
        .map(|(date, accounts)| {
            let currency = match accounts.first() {
                Some(first) => first.monthly_price.currency(),
                None => return Err(SubscriptionError::validation("empty bucket")),
            };
            let total_amount_due = Money::try_sum(currency, accounts.iter().map(|c| &c.monthly_price))
                .map_err(|e| SubscriptionError::validation(format!("bucket {}: {}", date, e)))?;
            Ok((
                date,
                CalendarBucket {
                    date,
                    count: accounts.len(),
                    accounts,
                    total_amount_due,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn candidate(due: NaiveDate, price: Decimal, currency: Currency) -> DueDateCandidate {
        DueDateCandidate {
            account_id: AccountId::new(),
            next_due_date: due,
            monthly_price: Money::new(price, currency),
            holder_name: "Abonado".to_string(),
        }
    }

    #[test]
    fn test_same_day_accounts_share_a_bucket() {
        let candidates = vec![
            candidate(day(10), dec!(50), Currency::PEN),
            candidate(day(10), dec!(70), Currency::PEN),
            candidate(day(10), dec!(30), Currency::PEN),
        ];
        let range = DateRange::month(2024, 6).unwrap();
        let buckets = compute_due_date_buckets(&candidates, range).unwrap();

        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[&day(10)];
        assert_eq!(bucket.count, 3);
        assert_eq!(bucket.total_amount_due.amount(), dec!(150));
    }

    #[test]
    fn test_out_of_range_accounts_are_excluded() {
        let candidates = vec![
            candidate(day(1), dec!(50), Currency::PEN),
            candidate(day(5), dec!(50), Currency::PEN),
            candidate(day(20), dec!(50), Currency::PEN),
        ];
        let range = DateRange::new(day(5), day(19)).unwrap();
        let buckets = compute_due_date_buckets(&candidates, range).unwrap();

        assert_eq!(buckets.keys().copied().collect::<Vec<_>>(), vec![day(5)]);
    }

    #[test]
    fn test_empty_days_are_absent() {
        let range = DateRange::month(2024, 6).unwrap();
        let buckets = compute_due_date_buckets(&Vec::<DueDateCandidate>::new(), range).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_mixed_currencies_on_one_day_are_rejected() {
        let candidates = vec![
            candidate(day(3), dec!(50), Currency::PEN),
            candidate(day(3), dec!(20), Currency::USD),
        ];
        let range = DateRange::month(2024, 6).unwrap();
        let result = compute_due_date_buckets(&candidates, range);
        assert!(matches!(result, Err(SubscriptionError::Validation(_))));
    }
}
