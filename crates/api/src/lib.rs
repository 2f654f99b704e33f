//! HTTP API server for the pharmacy order service.
//!
//! Provides REST endpoints for order placement, role-gated status updates
//! and order lookups, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{OrderItemStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + OrderItemStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/users/{user_id}/orders",
            post(routes::orders::place::<S>).get(routes::orders::list_for_user::<S>),
        )
        .route(
            "/users/{user_id}/orders/{order_id}/status",
            put(routes::orders::update_status_by_user::<S>),
        )
        .route(
            "/pharmacies/{pharmacy_id}/orders",
            get(routes::orders::list_for_pharmacy::<S>),
        )
        .route(
            "/pharmacies/{pharmacy_id}/orders/{order_id}/status",
            put(routes::orders::update_status_by_pharmacy::<S>),
        )
        .route("/orders/{order_id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
