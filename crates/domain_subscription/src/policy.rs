//! Billing policies
//!
//! Behaviours that differ between operators are switches here, not
//! assumptions inside the algorithms. The defaults match how the back
//! office has always billed.

use serde::{Deserialize, Serialize};

/// What happens to months paid beyond the existing debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Advance months are counted in `advance_months_consumed` and not
    /// carried into future cycles
    #[default]
    Consume,
    /// Advance months become credit that absorbs later accruals before
    /// any new debt is recorded
    CarryForward,
}

/// Whether outstanding debt blocks reactivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactivationPolicy {
    /// Reactivate regardless of months owed; debt survives reactivation
    #[default]
    AllowWithDebt,
    /// Refuse reactivation while any month is owed
    BlockWhileOwing,
}

/// How a payment amount is checked against the months it settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCheck {
    /// Amount must equal monthly price times months settled
    #[default]
    Exact,
    /// Amount must cover at least monthly price times months settled
    AtLeast,
    /// Any positive amount is accepted
    Unchecked,
}

/// The full set of billing policies applied by the subscription service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingPolicy {
    pub advance: AdvancePolicy,
    pub reactivation: ReactivationPolicy,
    pub amount_check: AmountCheck,
}

impl BillingPolicy {
    /// Sets the advance payment policy
    pub fn with_advance(mut self, advance: AdvancePolicy) -> Self {
        self.advance = advance;
        self
    }

    /// Sets the reactivation policy
    pub fn with_reactivation(mut self, reactivation: ReactivationPolicy) -> Self {
        self.reactivation = reactivation;
        self
    }

    /// Sets the payment amount check
    pub fn with_amount_check(mut self, amount_check: AmountCheck) -> Self {
        self.amount_check = amount_check;
        self
    }
}
