//! Domain events for the account aggregate
//!
//! Events are accumulated on the aggregate during a mutation and drained by
//! the service once the unit of work commits. Stores use them to know which
//! history rows to append; the service logs them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Money};

use crate::ledger::LedgerEntry;
use crate::lifecycle::SuspensionRecord;
use crate::payment::PaymentRecord;

/// Domain events emitted by the Account aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountEvent {
    /// A subscription started
    AccountOpened {
        account_id: AccountId,
        holder_name: String,
        monthly_price: Money,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    /// Price, plan or due date changed
    ProfileUpdated {
        account_id: AccountId,
        monthly_price: Money,
        plan: Option<String>,
        next_due_date: NaiveDate,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    /// Months owed changed
    LedgerAdjusted(LedgerEntry),

    /// A payment was applied
    PaymentRecorded(PaymentRecord),

    /// Service was suspended; carries the new open record
    Suspended(SuspensionRecord),

    /// Service was reactivated; carries the record as closed
    Reactivated(SuspensionRecord),

    /// The account reached its terminal state
    Cancelled {
        account_id: AccountId,
        actor: String,
        timestamp: DateTime<Utc>,
        /// Suspension that was open at cancellation, now closed
        closed_suspension: Option<SuspensionRecord>,
    },
}

impl AccountEvent {
    /// Returns the account ID associated with this event
    pub fn account_id(&self) -> AccountId {
        match self {
            AccountEvent::AccountOpened { account_id, .. } => *account_id,
            AccountEvent::ProfileUpdated { account_id, .. } => *account_id,
            AccountEvent::LedgerAdjusted(entry) => entry.account_id,
            AccountEvent::PaymentRecorded(payment) => payment.account_id,
            AccountEvent::Suspended(record) => record.account_id,
            AccountEvent::Reactivated(record) => record.account_id,
            AccountEvent::Cancelled { account_id, .. } => *account_id,
        }
    }

    /// Returns the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountOpened { timestamp, .. } => *timestamp,
            AccountEvent::ProfileUpdated { timestamp, .. } => *timestamp,
            AccountEvent::LedgerAdjusted(entry) => entry.recorded_at,
            AccountEvent::PaymentRecorded(payment) => payment.recorded_at,
            AccountEvent::Suspended(record) => record.suspended_at,
            AccountEvent::Reactivated(record) => record.reactivated_at.unwrap_or(record.suspended_at),
            AccountEvent::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountOpened { .. } => "AccountOpened",
            AccountEvent::ProfileUpdated { .. } => "ProfileUpdated",
            AccountEvent::LedgerAdjusted(_) => "LedgerAdjusted",
            AccountEvent::PaymentRecorded(_) => "PaymentRecorded",
            AccountEvent::Suspended(_) => "Suspended",
            AccountEvent::Reactivated(_) => "Reactivated",
            AccountEvent::Cancelled { .. } => "Cancelled",
        }
    }
}
