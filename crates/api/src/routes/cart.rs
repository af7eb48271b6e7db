//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{CartItemId, ProductId, VariantId};
use domain::CartView;
use serde::Deserialize;
use store::{CartItem, Storefront};

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// GET /cart: the caller's cart with its subtotal.
#[tracing::instrument(skip(state))]
pub async fn view<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.view(caller.user_id).await?))
}

/// POST /cart/items: add a product to the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBody(req): JsonBody<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let item = state
        .cart
        .add_item(caller.user_id, req.product_id, req.variant_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /cart/items/{id}: change a line's quantity; zero removes it.
#[tracing::instrument(skip(state, req))]
pub async fn update_quantity<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateQuantityRequest>,
) -> Result<Response, ApiError> {
    let id: CartItemId = parse_id(&id, "cart item id")?;
    match state
        .cart
        .update_quantity(caller.user_id, id, req.quantity)
        .await?
    {
        Some(item) => Ok(Json(item).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// DELETE /cart/items/{id}: remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: CartItemId = parse_id(&id, "cart item id")?;
    state.cart.remove_item(caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
