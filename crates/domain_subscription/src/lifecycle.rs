//! Service lifecycle state machine
//!
//! ```text
//! active ──suspend──▶ suspended ──reactivate──▶ active
//!   │                    │
//!   └──────cancel────────┴──────▶ cancelled (terminal)
//! ```
//!
//! Suspension never touches `months_owed`. Each suspension appends a
//! `SuspensionRecord`; reactivation closes it. Cancelling a suspended
//! account closes the open record too, so a non-suspended account never
//! has an open record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, SuspensionId};

use crate::account::{Account, ServiceStatus};
use crate::error::{require_text, SubscriptionError};
use crate::events::AccountEvent;
use crate::policy::ReactivationPolicy;

/// Why service was suspended
///
/// Known labels map onto the fixed variants case-insensitively; anything
/// else is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SuspensionReason {
    NonPayment,
    CustomerRequest,
    TechnicalIssue,
    Relocation,
    Other(String),
}

impl SuspensionReason {
    /// Parses an operator-entered label
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Validation` for an empty label
    pub fn parse(label: &str) -> Result<Self, SubscriptionError> {
        let trimmed = label.trim();
        require_text("reason", trimmed)?;

        let normalized = trimmed.to_lowercase().replace(['_', '-'], " ");
        let reason = match normalized.as_str() {
            "non payment" | "nonpayment" | "no paga" | "falta de pago" => SuspensionReason::NonPayment,
            "customer request" | "solicitud del cliente" | "a pedido del cliente" => {
                SuspensionReason::CustomerRequest
            }
            "technical issue" | "falla tecnica" | "falla técnica" => SuspensionReason::TechnicalIssue,
            "relocation" | "mudanza" | "traslado" => SuspensionReason::Relocation,
            _ => SuspensionReason::Other(trimmed.to_string()),
        };
        Ok(reason)
    }

    /// Stable code; `Other` keeps its label
    pub fn code(&self) -> &str {
        match self {
            SuspensionReason::NonPayment => "non_payment",
            SuspensionReason::CustomerRequest => "customer_request",
            SuspensionReason::TechnicalIssue => "technical_issue",
            SuspensionReason::Relocation => "relocation",
            SuspensionReason::Other(label) => label,
        }
    }
}

impl fmt::Display for SuspensionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<SuspensionReason> for String {
    fn from(reason: SuspensionReason) -> Self {
        reason.code().to_string()
    }
}

impl TryFrom<String> for SuspensionReason {
    type Error = SubscriptionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SuspensionReason::parse(&value)
    }
}

/// How a suspension ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionEnd {
    Reactivation,
    Cancellation,
}

impl SuspensionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspensionEnd::Reactivation => "reactivation",
            SuspensionEnd::Cancellation => "cancellation",
        }
    }
}

/// Audit entry for one suspension period
///
/// Open while `reactivated_at` is absent. Once closed it is never mutated.
/// When a suspended account is cancelled the closing fields hold the
/// cancelling actor and time, and `ended_by` says so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspensionRecord {
    pub id: SuspensionId,
    pub account_id: AccountId,
    pub reason: SuspensionReason,
    pub notes: Option<String>,
    pub suspended_by: String,
    pub suspended_at: DateTime<Utc>,
    pub reactivated_by: Option<String>,
    pub reactivated_at: Option<DateTime<Utc>>,
    pub ended_by: Option<SuspensionEnd>,
}

impl SuspensionRecord {
    /// Returns true while the suspension has not been closed
    pub fn is_open(&self) -> bool {
        self.reactivated_at.is_none()
    }

    fn close(&mut self, actor: &str, at: DateTime<Utc>, ended_by: SuspensionEnd) {
        self.reactivated_by = Some(actor.to_string());
        self.reactivated_at = Some(at);
        self.ended_by = Some(ended_by);
    }
}

/// Request to suspend service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendRequest {
    pub reason: String,
    pub notes: Option<String>,
    pub actor: String,
}

impl Account {
    /// Suspends service and opens a suspension record
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::InvalidTransition` if already suspended or cancelled,
    ///   reported ahead of any input problem
    /// - `SubscriptionError::Validation` for an empty reason or actor
    pub fn suspend(&mut self, request: &SuspendRequest) -> Result<SuspensionRecord, SubscriptionError> {
        self.status().validate_transition(ServiceStatus::Suspended)?;
        require_text("actor", &request.actor)?;
        let reason = SuspensionReason::parse(&request.reason)?;

        let now = self.touch();
        let record = SuspensionRecord {
            id: SuspensionId::new(),
            account_id: self.id(),
            reason,
            notes: request
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            suspended_by: request.actor.trim().to_string(),
            suspended_at: now,
            reactivated_by: None,
            reactivated_at: None,
            ended_by: None,
        };

        self.set_status(ServiceStatus::Suspended);
        self.push_suspension(record.clone());
        self.push_event(AccountEvent::Suspended(record.clone()));
        Ok(record)
    }

    /// Reactivates a suspended account and closes its open record
    ///
    /// Months owed are left untouched.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::InvalidTransition` unless suspended
    /// - `SubscriptionError::Validation` for an empty actor
    /// - `SubscriptionError::InvalidState` if the policy blocks reactivation
    ///   while months are owed
    pub fn reactivate(
        &mut self,
        actor: &str,
        policy: ReactivationPolicy,
    ) -> Result<SuspensionRecord, SubscriptionError> {
        if self.status() != ServiceStatus::Suspended {
            return Err(SubscriptionError::InvalidTransition {
                from: self.status().to_string(),
                to: ServiceStatus::Active.to_string(),
            });
        }
        require_text("actor", actor)?;
        if policy == ReactivationPolicy::BlockWhileOwing && self.months_owed() > 0 {
            return Err(SubscriptionError::invalid_state(format!(
                "account {} owes {} months and cannot be reactivated",
                self.id(),
                self.months_owed()
            )));
        }
        if self.open_suspension().is_none() {
            return Err(SubscriptionError::invalid_state(format!(
                "suspended account {} has no open suspension record",
                self.id()
            )));
        }

        let now = self.touch();
        let actor = actor.trim();
        let closed = match self.open_suspension_mut() {
            Some(record) => {
                record.close(actor, now, SuspensionEnd::Reactivation);
                record.clone()
            }
            None => return Err(SubscriptionError::invalid_state("open suspension record disappeared")),
        };

        self.set_status(ServiceStatus::Active);
        self.push_event(AccountEvent::Reactivated(closed.clone()));
        Ok(closed)
    }

    /// Cancels the account; terminal
    ///
    /// Returns the suspension record closed by the cancellation, if the
    /// account was suspended.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::InvalidTransition` if already cancelled
    /// - `SubscriptionError::Validation` for an empty actor
    pub fn cancel(&mut self, actor: &str) -> Result<Option<SuspensionRecord>, SubscriptionError> {
        self.status().validate_transition(ServiceStatus::Cancelled)?;
        require_text("actor", actor)?;

        let now = self.touch();
        let actor = actor.trim();
        let closed = self.open_suspension_mut().map(|record| {
            record.close(actor, now, SuspensionEnd::Cancellation);
            record.clone()
        });

        self.mark_cancelled(actor, now);
        self.push_event(AccountEvent::Cancelled {
            account_id: self.id(),
            actor: actor.to_string(),
            timestamp: now,
            closed_suspension: closed.clone(),
        });
        Ok(closed)
    }
}
