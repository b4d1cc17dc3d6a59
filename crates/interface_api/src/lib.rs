//! HTTP API Layer
//!
//! This crate provides the REST API for the subscriber billing system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per area (accounts, lifecycle, schedule, health)
//! - **Middleware**: request ids, tracing and audit logging
//! - **DTOs**: request bodies validated with `validator`, response views
//! - **Error Handling**: each domain error kind keeps its own status code;
//!   malformed bodies, paths and queries answer 400 through `extract`
//!
//! Every mutation carries its `actor` in the request body.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_subscription::SubscriptionService;

use crate::handlers::{accounts, health, lifecycle, schedule};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: SubscriptionService,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - Subscription service over the configured account store
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(service: SubscriptionService) -> Router {
    let state = AppState { service };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let account_routes = Router::new()
        .route("/", post(accounts::open_account).get(accounts::list_accounts))
        .route("/:id", get(accounts::get_account).patch(accounts::update_profile))
        .route("/:id/ledger", post(accounts::apply_delta).get(accounts::ledger_history))
        .route("/:id/payments", post(accounts::submit_payment).get(accounts::payment_history))
        .route("/:id/suspend", post(lifecycle::suspend))
        .route("/:id/reactivate", post(lifecycle::reactivate))
        .route("/:id/cancel", post(lifecycle::cancel))
        .route("/:id/suspensions", get(lifecycle::suspension_history));

    let schedule_routes = Router::new().route("/due-dates", get(schedule::due_date_buckets));

    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/schedule", schedule_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
