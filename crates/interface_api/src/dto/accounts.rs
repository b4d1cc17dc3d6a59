//! Account DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Currency;
use domain_subscription::{
    Account, AccountQuery, LedgerEntry, OpenAccountRequest, ProfileUpdate, ServiceStatus,
    SuspensionRecord,
};

#[derive(Debug, Deserialize, Validate)]
pub struct OpenAccountBody {
    #[validate(length(min = 1, max = 200))]
    pub holder_name: String,
    #[validate(length(max = 120))]
    pub plan: Option<String>,
    pub monthly_price: Decimal,
    pub currency: Currency,
    pub next_due_date: NaiveDate,
    #[serde(default)]
    pub months_owed: u32,
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}

impl From<OpenAccountBody> for OpenAccountRequest {
    fn from(body: OpenAccountBody) -> Self {
        OpenAccountRequest {
            holder_name: body.holder_name,
            plan: body.plan,
            monthly_price: body.monthly_price,
            currency: body.currency,
            next_due_date: body.next_due_date,
            months_owed: body.months_owed,
            actor: body.actor,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileBody {
    #[validate(length(min = 1, max = 200))]
    pub holder_name: Option<String>,
    #[validate(length(max = 120))]
    pub plan: Option<String>,
    pub monthly_price: Option<Decimal>,
    pub next_due_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}

impl From<UpdateProfileBody> for ProfileUpdate {
    fn from(body: UpdateProfileBody) -> Self {
        ProfileUpdate {
            holder_name: body.holder_name,
            plan: body.plan,
            monthly_price: body.monthly_price,
            next_due_date: body.next_due_date,
            actor: body.actor,
        }
    }
}

/// Query string for `GET /accounts`
#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsParams {
    pub status: Option<ServiceStatus>,
    #[serde(default)]
    pub billable_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListAccountsParams> for AccountQuery {
    fn from(params: ListAccountsParams) -> Self {
        AccountQuery {
            status: params.status,
            exclude_cancelled: params.billable_only,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyDeltaBody {
    pub months_delta: i32,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(min = 1, max = 100))]
    pub actor: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub holder_name: String,
    pub plan: Option<String>,
    pub monthly_price: Decimal,
    pub currency: Currency,
    pub months_owed: u32,
    /// `monthly_price * months_owed`; absent only if it overflows
    pub amount_owed: Option<Decimal>,
    pub advance_months_consumed: u32,
    pub advance_credit_months: u32,
    pub status: ServiceStatus,
    pub next_due_date: NaiveDate,
    pub open_suspension: Option<SuspensionRecord>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub version: u32,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: *account.id().as_uuid(),
            holder_name: account.holder_name().to_string(),
            plan: account.plan().map(str::to_string),
            monthly_price: account.monthly_price().amount(),
            currency: account.currency(),
            months_owed: account.months_owed(),
            amount_owed: account.amount_owed().ok().map(|m| m.amount()),
            advance_months_consumed: account.advance_months_consumed(),
            advance_credit_months: account.advance_credit_months(),
            status: account.status(),
            next_due_date: account.next_due_date(),
            open_suspension: account.open_suspension().cloned(),
            opened_at: account.opened_at(),
            updated_at: account.updated_at(),
            cancelled_at: account.cancelled_at(),
            cancelled_by: account.cancelled_by().map(str::to_string),
            version: account.version(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeltaResponse {
    pub account: AccountResponse,
    pub entry: LedgerEntry,
}
