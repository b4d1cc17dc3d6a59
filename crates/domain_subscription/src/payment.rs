//! Payment application
//!
//! The caller states how many months a payment settles; the engine never
//! infers months from the amount, it only checks that the two agree. Months
//! beyond the current debt are an advance: debt stops at zero, the receipt
//! keeps the full `months_settled`, and `months_deducted` records what was
//! actually removed. The two numbers are stored side by side and never
//! reconciled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountId, Money, PaymentId};

use crate::account::Account;
use crate::error::{require_text, SubscriptionError};
use crate::events::AccountEvent;
use crate::policy::{AmountCheck, BillingPolicy};

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    BankDeposit,
    CreditCard,
    DebitCard,
    /// Yape, Plin and similar phone wallets
    MobileWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::BankDeposit => "bank_deposit",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::MobileWallet => "mobile_wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = SubscriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "bank_deposit" => Ok(PaymentMethod::BankDeposit),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "mobile_wallet" => Ok(PaymentMethod::MobileWallet),
            other => Err(SubscriptionError::validation(format!("unknown payment method: {}", other))),
        }
    }
}

/// A payment as entered by an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPaymentRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub months_settled: u32,
    pub method: PaymentMethod,
    /// Caller-supplied idempotency key, unique per account
    pub receipt_number: String,
    /// When the money was received; defaults to now
    pub paid_at: Option<DateTime<Utc>>,
    pub operation_number: Option<String>,
    pub notes: Option<String>,
    pub contact: Option<String>,
    pub actor: String,
}

impl SubmitPaymentRequest {
    /// Checks the request on its own, before any account state is consulted
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Validation` for a non-positive amount,
    /// zero months, or an empty receipt number or actor
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        if self.amount <= Decimal::ZERO {
            return Err(SubscriptionError::validation("amount must be greater than zero"));
        }
        if self.months_settled == 0 {
            return Err(SubscriptionError::validation("months_settled must be at least 1"));
        }
        require_text("receipt_number", &self.receipt_number)?;
        require_text("actor", &self.actor)?;
        Ok(())
    }

    /// Receipt number as stored
    pub fn normalized_receipt(&self) -> &str {
        self.receipt_number.trim()
    }
}

/// An applied payment; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub amount: Money,
    /// Months the payer chose to settle, as on the receipt
    pub months_settled: u32,
    /// Months of existing debt actually removed
    pub months_deducted: u32,
    /// `months_settled - months_deducted`
    pub advance_months: u32,
    pub receipt_number: String,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub operation_number: Option<String>,
    pub notes: Option<String>,
    pub contact: Option<String>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

/// Applies payments to accounts under a billing policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentApplier {
    policy: BillingPolicy,
}

impl PaymentApplier {
    /// Creates an applier for the given policy
    pub fn new(policy: BillingPolicy) -> Self {
        Self { policy }
    }

    /// Applies a payment to the account
    ///
    /// Receipt uniqueness is a property of the account's stored history and
    /// is checked by the caller before this runs.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::Validation` for malformed input, an amount with
    ///   sub-cent digits, or an amount that fails the configured check
    /// - `SubscriptionError::InvalidState` if the account is cancelled
    pub fn apply(
        &self,
        account: &mut Account,
        request: &SubmitPaymentRequest,
    ) -> Result<PaymentRecord, SubscriptionError> {
        request.validate()?;
        if request.account_id != account.id() {
            return Err(SubscriptionError::validation(format!(
                "payment for {} submitted against {}",
                request.account_id,
                account.id()
            )));
        }
        account.ensure_not_cancelled("submit payment")?;

        let amount = Money::exact(request.amount, account.currency())?;
        self.check_amount(account.monthly_price(), request.months_settled, amount)?;

        let receipt = request.normalized_receipt();
        let delta = i32::try_from(request.months_settled)
            .map(|m| -m)
            .map_err(|_| SubscriptionError::validation("months_settled is too large"))?;
        let entry = account.record_delta(
            delta,
            &format!("payment receipt {}", receipt),
            &request.actor,
            self.policy.advance,
        )?;

        let now = account.touch();
        let months_deducted = entry.applied_delta.unsigned_abs();
        let record = PaymentRecord {
            id: PaymentId::new(),
            account_id: account.id(),
            amount,
            months_settled: request.months_settled,
            months_deducted,
            advance_months: entry.advance_months,
            receipt_number: receipt.to_string(),
            method: request.method,
            paid_at: request.paid_at.unwrap_or(now),
            operation_number: clean(request.operation_number.as_deref()),
            notes: clean(request.notes.as_deref()),
            contact: clean(request.contact.as_deref()),
            recorded_by: request.actor.trim().to_string(),
            recorded_at: now,
        };

        account.push_event(AccountEvent::LedgerAdjusted(entry));
        account.push_event(AccountEvent::PaymentRecorded(record.clone()));
        Ok(record)
    }

    /// A free plan has no price to match, so any positive amount is accepted.
    fn check_amount(&self, monthly_price: Money, months: u32, amount: Money) -> Result<(), SubscriptionError> {
        if monthly_price.is_zero() {
            return Ok(());
        }
        let expected = monthly_price.times(months)?;
        match self.policy.amount_check {
            AmountCheck::Exact if amount != expected => Err(SubscriptionError::validation(format!(
                "amount {} does not match {} months at {} ({})",
                amount, months, monthly_price, expected
            ))),
            AmountCheck::AtLeast if amount.amount() < expected.amount() => {
                Err(SubscriptionError::validation(format!(
                    "amount {} does not cover {} months at {} ({})",
                    amount, months, monthly_price, expected
                )))
            }
            _ => Ok(()),
        }
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
