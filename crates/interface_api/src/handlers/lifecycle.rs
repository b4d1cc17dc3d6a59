//! Lifecycle handlers

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountId;
use domain_subscription::SuspensionRecord;

use crate::dto::accounts::AccountResponse;
use crate::dto::lifecycle::{ActorBody, SuspendBody};
use crate::extract::{ApiJson, ApiPath};
use crate::{error::ApiError, AppState};

/// Suspends service
pub async fn suspend(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<SuspendBody>,
) -> Result<Json<AccountResponse>, ApiError> {
    body.validate()?;
    let account = state.service.suspend(AccountId::from_uuid(id), body.into()).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Reactivates a suspended account
pub async fn reactivate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ActorBody>,
) -> Result<Json<AccountResponse>, ApiError> {
    body.validate()?;
    let account = state.service.reactivate(AccountId::from_uuid(id), &body.actor).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Cancels an account
pub async fn cancel(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ActorBody>,
) -> Result<Json<AccountResponse>, ApiError> {
    body.validate()?;
    let account = state.service.cancel(AccountId::from_uuid(id), &body.actor).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Suspension history, oldest first
pub async fn suspension_history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<SuspensionRecord>>, ApiError> {
    Ok(Json(state.service.suspension_history(AccountId::from_uuid(id)).await?))
}
