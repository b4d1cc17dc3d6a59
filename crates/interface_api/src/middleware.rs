//! API middleware

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use chrono::Utc;
use tracing::{info, warn};

/// Header naming the operator behind a request
pub const ACTOR_HEADER: &str = "x-actor";

/// Audit logging middleware
///
/// Logs every API request with the operator named in `x-actor`, if any.
/// The actor recorded on a mutation is always the one in the request body.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            uri = %uri,
            actor = %actor,
            status = status.as_u16(),
            duration_ms = duration.num_milliseconds(),
            "API request failed"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            actor = %actor,
            status = status.as_u16(),
            duration_ms = duration.num_milliseconds(),
            "API request"
        );
    }

    response
}
