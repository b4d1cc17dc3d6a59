//! Subscription domain errors
//!
//! Every operation reports failures synchronously through
//! `SubscriptionError`. Nothing is retried internally and a failed
//! operation leaves the account exactly as it was.

use core_kernel::{MoneyError, TemporalError};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the subscription domain
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Account does not exist
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Lifecycle rule violation (e.g. suspending a cancelled account)
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    /// Operation not permitted given the account's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Receipt number already used for this account
    #[error("Duplicate receipt {receipt_number} for account {account_id}")]
    DuplicateReceipt {
        account_id: String,
        receipt_number: String,
    },

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stable classification of a `SubscriptionError`
///
/// Callers surface each kind distinctly; a duplicate receipt is never
/// reported as a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    InvalidState,
    DuplicateReceipt,
    Validation,
    Storage,
}

impl ErrorKind {
    /// Machine-readable code for the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::DuplicateReceipt => "duplicate_receipt",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Storage => "storage_error",
        }
    }
}

impl SubscriptionError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        SubscriptionError::Validation(message.into())
    }

    /// Creates an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        SubscriptionError::InvalidState(message.into())
    }

    /// Creates a not found error for an account
    pub fn not_found(account_id: impl std::fmt::Display) -> Self {
        SubscriptionError::NotFound(account_id.to_string())
    }

    /// Creates a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        SubscriptionError::Storage(message.into())
    }

    /// Returns the error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubscriptionError::NotFound(_) => ErrorKind::NotFound,
            SubscriptionError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SubscriptionError::InvalidState(_) => ErrorKind::InvalidState,
            SubscriptionError::DuplicateReceipt { .. } => ErrorKind::DuplicateReceipt,
            SubscriptionError::Validation(_) => ErrorKind::Validation,
            SubscriptionError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<MoneyError> for SubscriptionError {
    fn from(err: MoneyError) -> Self {
        SubscriptionError::Validation(err.to_string())
    }
}

impl From<TemporalError> for SubscriptionError {
    fn from(err: TemporalError) -> Self {
        SubscriptionError::Validation(err.to_string())
    }
}

/// Rejects empty or whitespace-only required text
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), SubscriptionError> {
    if value.trim().is_empty() {
        return Err(SubscriptionError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}
