//! Account handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountId;
use domain_subscription::{ApplyDeltaRequest, LedgerEntry, PaymentRecord};

use crate::dto::accounts::*;
use crate::dto::payments::{PaymentResponse, SubmitPaymentBody};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::{error::ApiError, AppState};

/// Opens a subscriber account
pub async fn open_account(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<OpenAccountBody>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    body.validate()?;
    let account = state.service.open_account(body.into()).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Lists accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListAccountsParams>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.service.list_accounts(params.into()).await?;
    Ok(Json(accounts.iter().map(AccountResponse::from).collect()))
}

/// Gets an account by ID
pub async fn get_account(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.service.get_state(AccountId::from_uuid(id)).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Updates price, plan, holder or due date
pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateProfileBody>,
) -> Result<Json<AccountResponse>, ApiError> {
    body.validate()?;
    let account = state
        .service
        .update_profile(AccountId::from_uuid(id), body.into())
        .await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Adjusts months owed; the monthly accrual job posts `+1` here
pub async fn apply_delta(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ApplyDeltaBody>,
) -> Result<Json<DeltaResponse>, ApiError> {
    body.validate()?;
    let request = ApplyDeltaRequest {
        months_delta: body.months_delta,
        reason: body.reason,
        actor: body.actor,
    };
    let applied = state.service.apply_delta(AccountId::from_uuid(id), request).await?;
    Ok(Json(DeltaResponse {
        account: AccountResponse::from(&applied.account),
        entry: applied.entry,
    }))
}

/// Ledger entries in recording order
pub async fn ledger_history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    Ok(Json(state.service.ledger_history(AccountId::from_uuid(id)).await?))
}

/// Applies a payment
pub async fn submit_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SubmitPaymentBody>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    body.validate()?;
    let applied = state
        .service
        .submit_payment(body.into_request(AccountId::from_uuid(id)))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            account: AccountResponse::from(&applied.account),
            payment: applied.payment,
        }),
    ))
}

/// Payments in the order they were applied
pub async fn payment_history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    Ok(Json(state.service.payment_history(AccountId::from_uuid(id)).await?))
}
