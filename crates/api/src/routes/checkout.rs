//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::{CheckoutReceipt, CheckoutRequest};
use common::Money;
use serde::Deserialize;
use store::Storefront;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub shipping_info: String,
    /// Client-computed total in cents. Advisory only.
    pub total_price_cents: Option<i64>,
    #[serde(default)]
    pub update_address: bool,
}

impl From<CheckoutBody> for CheckoutRequest {
    fn from(body: CheckoutBody) -> Self {
        CheckoutRequest {
            shipping_info: body.shipping_info,
            client_total: body.total_price_cents.map(Money::from_cents),
            update_address: body.update_address,
        }
    }
}

/// POST /checkout: place an order from the caller's cart.
#[tracing::instrument(skip(state, body))]
pub async fn place_order<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBody(body): JsonBody<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
    let receipt = state
        .checkout
        .checkout(caller.user_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
