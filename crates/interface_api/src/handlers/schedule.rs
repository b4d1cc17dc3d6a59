//! Due-date schedule handlers

use axum::{extract::State, Json};

use domain_subscription::CalendarBucket;

use crate::dto::schedule::DueDateParams;
use crate::extract::ApiQuery;
use crate::{error::ApiError, AppState};

/// Billable accounts grouped by due day, ascending
pub async fn due_date_buckets(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DueDateParams>,
) -> Result<Json<Vec<CalendarBucket>>, ApiError> {
    let buckets = state
        .service
        .compute_due_date_buckets(params.from, params.to)
        .await?;
    Ok(Json(buckets.into_values().collect()))
}
