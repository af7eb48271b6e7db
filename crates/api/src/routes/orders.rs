//! Order endpoints: listing, details, status transitions and deletion.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::OrderDetails;
use serde::{Deserialize, Serialize};
use store::{Order, Storefront};

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub order: Order,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /orders: the caller's orders, or every order for administrators.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = if caller.is_admin() {
        state.orders.list_orders().await?
    } else {
        state.orders.list_orders_for_user(caller.user_id).await?
    };
    Ok(Json(orders))
}

/// GET /orders/{id}: an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let details = state.orders.get_order(order_id).await?;

    if !caller.is_admin() && details.order.user_id != caller.user_id {
        return Err(ApiError::Forbidden(format!(
            "Order {order_id} belongs to another user"
        )));
    }
    Ok(Json(details))
}

/// PATCH /orders/{id}/status: move an order to another status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    caller.require_admin()?;
    let order_id: OrderId = parse_id(&id, "order id")?;

    let result = state.orders.transition(order_id, &req.status).await?;
    Ok(Json(StatusResponse {
        order: result.order,
        message: result.message,
    }))
}

/// DELETE /orders/{id}: permanently remove an order and its items.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    caller.require_admin()?;
    let order_id: OrderId = parse_id(&id, "order id")?;

    let message = state.orders.delete_order(order_id).await?;
    Ok(Json(MessageResponse { message }))
}
