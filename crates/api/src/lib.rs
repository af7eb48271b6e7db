//! HTTP API server with observability for the storefront order core.
//!
//! Provides REST endpoints for carts, checkout, orders and ratings,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::TransitionPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Storefront;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storefront>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update_quantity::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route("/checkout", post(routes::checkout::place_order::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::delete::<S>),
        )
        .route("/orders/{id}/status", patch(routes::orders::update_status::<S>))
        .route(
            "/products/{id}/ratings",
            get(routes::ratings::list::<S>).post(routes::ratings::submit::<S>),
        )
        .route(
            "/ratings/{id}",
            patch(routes::ratings::edit::<S>).delete(routes::ratings::delete::<S>),
        )
        .route("/ratings/{id}/moderation", patch(routes::ratings::moderate::<S>))
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

/// Creates the application state over the given store.
pub fn create_state<S: Storefront>(store: S, policy: TransitionPolicy) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, policy))
}
