//! Pre-built Test Fixtures
//!
//! Provides ready-to-use values shared across the subscriber billing tests.
//! These fixtures are consistent and predictable for unit tests.

use chrono::NaiveDate;
use core_kernel::{Currency, DateRange, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Basic cable plan price
    pub fn basic_plan_price() -> Decimal {
        dec!(50.00)
    }

    /// Cable plus internet bundle price
    pub fn bundle_price() -> Decimal {
        dec!(89.90)
    }

    /// Basic plan price as Money
    pub fn pen_50() -> Money {
        Money::new(dec!(50.00), Currency::PEN)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_20() -> Money {
        Money::new(dec!(20.00), Currency::USD)
    }

    /// Zero in the default currency
    pub fn pen_zero() -> Money {
        Money::zero(Currency::PEN)
    }
}

/// Fixture for calendar test data
pub struct DateFixtures;

impl DateFixtures {
    /// A mid-month due date
    pub fn due_mid_june() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// A month-end due date
    pub fn due_end_june() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    /// First day of the following month
    pub fn due_july_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    /// June 2024 as an inclusive range
    pub fn june_2024() -> DateRange {
        DateRange::month(2024, 6).unwrap()
    }
}

/// Fixture for operator and document strings
pub struct StringFixtures;

impl StringFixtures {
    /// Back-office operator
    pub fn admin() -> &'static str {
        "Admin"
    }

    /// Cashier who records payments
    pub fn cashier() -> &'static str {
        "Caja 1"
    }

    /// Actor of the monthly accrual job
    pub fn scheduler() -> &'static str {
        "billing-scheduler"
    }

    /// A receipt number in the series used by tests
    pub fn receipt(n: u32) -> String {
        format!("B001-{:06}", n)
    }

    /// Suspension reason for unpaid accounts
    pub fn non_payment() -> &'static str {
        "No paga"
    }
}
