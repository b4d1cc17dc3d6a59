//! Test Data Builders
//!
//! Provides builder patterns for constructing domain requests with sensible
//! defaults. Tests specify only the relevant fields and take defaults for
//! everything else.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{AccountId, Currency};
use domain_subscription::{
    Account, OpenAccountRequest, PaymentMethod, SubmitPaymentRequest, SuspendRequest,
};
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;

use crate::fixtures::{DateFixtures, MoneyFixtures, StringFixtures};

/// Builder for `OpenAccountRequest`
#[derive(Debug, Clone)]
pub struct OpenAccountBuilder {
    holder_name: String,
    plan: Option<String>,
    monthly_price: Decimal,
    currency: Currency,
    next_due_date: NaiveDate,
    months_owed: u32,
    actor: String,
}

impl Default for OpenAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAccountBuilder {
    /// Creates a builder for an up-to-date basic plan with a random holder
    pub fn new() -> Self {
        Self {
            holder_name: Name().fake(),
            plan: Some("Cable Basico".to_string()),
            monthly_price: MoneyFixtures::basic_plan_price(),
            currency: Currency::PEN,
            next_due_date: DateFixtures::due_mid_june(),
            months_owed: 0,
            actor: StringFixtures::admin().to_string(),
        }
    }

    /// Sets the account holder
    pub fn with_holder_name(mut self, name: impl Into<String>) -> Self {
        self.holder_name = name.into();
        self
    }

    /// Sets the plan label
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    /// Sets the monthly price
    pub fn with_monthly_price(mut self, price: Decimal) -> Self {
        self.monthly_price = price;
        self
    }

    /// Sets the billing currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Sets the next due date
    pub fn with_next_due_date(mut self, date: NaiveDate) -> Self {
        self.next_due_date = date;
        self
    }

    /// Sets the opening debt in months
    pub fn with_months_owed(mut self, months: u32) -> Self {
        self.months_owed = months;
        self
    }

    /// Sets the acting operator
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Builds the request
    pub fn build(self) -> OpenAccountRequest {
        OpenAccountRequest {
            holder_name: self.holder_name,
            plan: self.plan,
            monthly_price: self.monthly_price,
            currency: self.currency,
            next_due_date: self.next_due_date,
            months_owed: self.months_owed,
            actor: self.actor,
        }
    }

    /// Opens the account directly, without a store
    ///
    /// # Panics
    ///
    /// Panics if the request is invalid
    pub fn open(self) -> Account {
        Account::open(self.build()).expect("builder produced an invalid account")
    }
}

/// Builder for `SubmitPaymentRequest`
///
/// The amount defaults to the exact price of the settled months.
#[derive(Debug, Clone)]
pub struct PaymentBuilder {
    account_id: AccountId,
    monthly_price: Decimal,
    amount: Option<Decimal>,
    months_settled: u32,
    method: PaymentMethod,
    receipt_number: String,
    paid_at: Option<DateTime<Utc>>,
    operation_number: Option<String>,
    actor: String,
}

impl PaymentBuilder {
    /// Creates a one-month cash payment against an account
    pub fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id(),
            monthly_price: account.monthly_price().amount(),
            amount: None,
            months_settled: 1,
            method: PaymentMethod::Cash,
            receipt_number: StringFixtures::receipt(1),
            paid_at: None,
            operation_number: None,
            actor: StringFixtures::cashier().to_string(),
        }
    }

    /// Sets the months settled; the default amount follows
    pub fn months(mut self, months: u32) -> Self {
        self.months_settled = months;
        self
    }

    /// Overrides the amount
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the receipt number
    pub fn with_receipt(mut self, receipt: impl Into<String>) -> Self {
        self.receipt_number = receipt.into();
        self
    }

    /// Sets the payment method
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets when the money was received
    pub fn paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    /// Sets the bank operation number
    pub fn with_operation_number(mut self, number: impl Into<String>) -> Self {
        self.operation_number = Some(number.into());
        self
    }

    /// Sets the acting operator
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Builds the request
    pub fn build(self) -> SubmitPaymentRequest {
        let amount = self
            .amount
            .unwrap_or(self.monthly_price * Decimal::from(self.months_settled));
        SubmitPaymentRequest {
            account_id: self.account_id,
            amount,
            months_settled: self.months_settled,
            method: self.method,
            receipt_number: self.receipt_number,
            paid_at: self.paid_at,
            operation_number: self.operation_number,
            notes: None,
            contact: None,
            actor: self.actor,
        }
    }
}

/// Builder for `SuspendRequest`
#[derive(Debug, Clone)]
pub struct SuspendBuilder {
    reason: String,
    notes: Option<String>,
    actor: String,
}

impl Default for SuspendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendBuilder {
    /// Creates a non-payment suspension by the back office
    pub fn new() -> Self {
        Self {
            reason: StringFixtures::non_payment().to_string(),
            notes: None,
            actor: StringFixtures::admin().to_string(),
        }
    }

    /// Sets the reason label
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the acting operator
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Builds the request
    pub fn build(self) -> SuspendRequest {
        SuspendRequest {
            reason: self.reason,
            notes: self.notes,
            actor: self.actor,
        }
    }
}
