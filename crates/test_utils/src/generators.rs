//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::NaiveDate;
use core_kernel::Currency;
use domain_subscription::{OpenAccountRequest, PaymentMethod};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::PEN),
        Just(Currency::USD),
        Just(Currency::MXN),
        Just(Currency::COP),
        Just(Currency::BOB),
    ]
}

/// Strategy for monthly prices between 0.00 and 999.99 with two decimals
pub fn monthly_price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for a plausible opening debt
pub fn months_owed_strategy() -> impl Strategy<Value = u32> {
    0u32..36u32
}

/// Strategy for non-zero ledger deltas, negative ones included
pub fn months_delta_strategy() -> impl Strategy<Value = i32> {
    prop_oneof![(-24i32..=-1i32), (1i32..=24i32)]
}

/// Strategy for due dates across two years
pub fn due_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2024i32..2026i32, 1u32..=12u32, 1u32..=28u32)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Strategy for payment methods
pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::BankDeposit),
        Just(PaymentMethod::CreditCard),
        Just(PaymentMethod::DebitCard),
        Just(PaymentMethod::MobileWallet),
    ]
}

/// Strategy for suspension reason labels as operators type them
pub fn suspension_reason_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("No paga".to_string()),
        Just("non_payment".to_string()),
        Just("Solicitud del cliente".to_string()),
        Just("Falla tecnica".to_string()),
        Just("Mudanza".to_string()),
        "[A-Za-z][A-Za-z ]{2,30}",
    ]
}

/// Strategy for valid account-opening requests
pub fn open_account_strategy() -> impl Strategy<Value = OpenAccountRequest> {
    (
        "[A-Z][a-z]{2,10} [A-Z][a-z]{2,12}",
        monthly_price_strategy(),
        currency_strategy(),
        due_date_strategy(),
        months_owed_strategy(),
    )
        .prop_map(|(holder_name, monthly_price, currency, next_due_date, months_owed)| {
            OpenAccountRequest {
                holder_name,
                plan: None,
                monthly_price,
                currency,
                next_due_date,
                months_owed,
                actor: "proptest".to_string(),
            }
        })
}
