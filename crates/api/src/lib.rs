//! HTTP API for vendor onboarding.
//!
//! Exposes vendor registration, email verification, payment webhooks and
//! the plan catalog, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
///
/// With `redact_errors` set, 5xx bodies carry a generic message instead of
/// the underlying error.
pub fn create_app(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    redact_errors: bool,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let app = Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register/vendor", post(routes::auth::register_vendor))
        .route("/auth/verify", get(routes::auth::verify))
        .route("/payments/webhook", post(routes::payments::webhook))
        .route(
            "/payments/transactions",
            get(routes::payments::list_transactions),
        )
        .route(
            "/payments/transactions/{id}",
            get(routes::payments::get_transaction),
        )
        .route(
            "/subscriptions/plans",
            get(routes::subscriptions::list_plans).post(routes::subscriptions::create_plan),
        )
        .route(
            "/subscriptions/vendors/{vendor_id}/status",
            get(routes::subscriptions::vendor_status),
        )
        .with_state(state)
        .merge(metrics_router);

    let app = if redact_errors {
        app.layer(axum::middleware::map_response(error::redact_server_errors))
    } else {
        app
    };

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}
