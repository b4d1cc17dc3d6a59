//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::AccountId;
use domain_subscription::{PaymentMethod, PaymentRecord, SubmitPaymentRequest};

use super::accounts::AccountResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPaymentBody {
    pub amount: Decimal,
    #[validate(range(min = 1))]
    pub months_settled: u32,
    pub method: PaymentMethod,
    #[validate(length(min = 1, max = 64))]
    pub receipt_number: String,
    pub paid_at: Option<DateTime<Utc>>,
    #[validate(length(max = 64))]
    pub operation_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    #[validate(length(max = 120))]
    pub contact: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}

impl SubmitPaymentBody {
    pub fn into_request(self, account_id: AccountId) -> SubmitPaymentRequest {
        SubmitPaymentRequest {
            account_id,
            amount: self.amount,
            months_settled: self.months_settled,
            method: self.method,
            receipt_number: self.receipt_number,
            paid_at: self.paid_at,
            operation_number: self.operation_number,
            notes: self.notes,
            contact: self.contact,
            actor: self.actor,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub account: AccountResponse,
    pub payment: PaymentRecord,
}
