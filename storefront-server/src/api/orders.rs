//! Order endpoints: list, create, status transition, public checkout
//!
//! The acting store scope always comes from the verified token, never
//! from the request body. Checkout is the unauthenticated customer path;
//! it funnels into the same creation routine as the store API, so both
//! share one set of validation and atomicity guarantees.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::StoreIdentity;
use crate::db::orders::{
    self, CreatedOrder, NewOrder, NewOrderItem, OrderStatus, OrderSummary, TransitionOutcome,
};
use crate::error::AppError;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/orders — all orders of the acting store
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<StoreIdentity>,
) -> ApiResult<Vec<OrderSummary>> {
    let orders = orders::list_orders(&state.pool, identity.store_id).await?;
    Ok(Json(orders))
}

/// POST /api/orders
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Omitted for guest orders
    pub customer_id: Option<i64>,
    /// Initial status, defaults to Pending
    pub status: Option<OrderStatus>,
    pub items: Vec<NewOrderItem>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<StoreIdentity>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreatedOrder>), AppError> {
    let created = orders::create_order(
        &state.pool,
        NewOrder {
            store_id: identity.store_id,
            customer_id: req.customer_id,
            status: req.status.unwrap_or(OrderStatus::Pending),
            items: req.items,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/orders/{order_id}/status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, serde::Serialize)]
pub struct UpdateStatusResponse {
    pub outcome: TransitionOutcome,
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(identity): Extension<StoreIdentity>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<UpdateStatusResponse> {
    let outcome =
        orders::transition_status(&state.pool, order_id, req.status, identity.store_id).await?;
    Ok(Json(UpdateStatusResponse { outcome }))
}

/// POST /api/checkout — customer-facing order placement
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: i64,
    pub store_id: i64,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, serde::Serialize)]
pub struct CheckoutResponse {
    pub order_id: i64,
    pub total_amount: Decimal,
}

pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let created = orders::create_order(
        &state.pool,
        NewOrder {
            store_id: req.store_id,
            customer_id: Some(req.customer_id),
            status: OrderStatus::Pending,
            items: req.items,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: created.order_id,
            total_amount: created.total_amount,
        }),
    ))
}
