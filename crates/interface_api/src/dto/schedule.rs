//! Due-date schedule DTOs

use chrono::NaiveDate;
use serde::Deserialize;

/// Query string for `GET /schedule/due-dates`; both bounds inclusive
#[derive(Debug, Deserialize)]
pub struct DueDateParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}
