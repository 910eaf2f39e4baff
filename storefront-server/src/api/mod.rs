//! API routes

pub mod health;
pub mod orders;

use axum::routing::{get, post, put};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::auth::store_auth_middleware;
use crate::error::AppError;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Store API (JWT authenticated, store scope from the token)
    let store_api = Router::new()
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route(
            "/api/orders/{order_id}/status",
            put(orders::update_order_status),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            store_auth_middleware,
        ));

    // Customer checkout (no auth)
    let public = Router::new().route("/api/checkout", post(orders::checkout));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(store_api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
