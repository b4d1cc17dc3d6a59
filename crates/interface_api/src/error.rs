//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_subscription::{ErrorKind, SubscriptionError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// A rejected domain operation; its kind picks the status code
    #[error(transparent)]
    Domain(#[from] SubscriptionError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// Status code for each domain error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidTransition | ErrorKind::InvalidState | ErrorKind::DuplicateReceipt => {
            StatusCode::CONFLICT
        }
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match &self {
            ApiError::Domain(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Storage {
                    error!(error = %err, "Storage failure");
                }
                (status_for(kind), kind.as_str(), err.to_string(), None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            ApiError::Validation(errors) => {
                let fields = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, _)| field.to_string())
                    .collect::<Vec<_>>();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    self.to_string(),
                    Some(fields),
                )
            }
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg.clone(), None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_its_status() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::DuplicateReceipt), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::InvalidTransition), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Storage), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_error_response() {
        let response = ApiError::from(SubscriptionError::DuplicateReceipt {
            account_id: "ACC-1".to_string(),
            receipt_number: "R-1".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_bad_request_response() {
        let response = ApiError::BadRequest("expected value at line 1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
