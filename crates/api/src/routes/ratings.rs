//! Rating endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ProductId, RatingId};
use domain::RatingOutcome;
use serde::{Deserialize, Serialize};
use store::{Rating, Storefront};

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
    pub review: Option<String>,
}

#[derive(Deserialize)]
pub struct ModerationRequest {
    pub moderated: bool,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: String,
    pub average_rating: f64,
}

/// GET /products/{id}/ratings: moderated ratings; administrators see all.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<Rating>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    let ratings = state
        .ratings
        .list_for_product(product_id, caller.is_admin())
        .await?;
    Ok(Json(ratings))
}

/// POST /products/{id}/ratings: rate a product.
#[tracing::instrument(skip(state, req))]
pub async fn submit<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RatingRequest>,
) -> Result<(StatusCode, Json<RatingOutcome>), ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    let outcome = state
        .ratings
        .submit(product_id, caller.user_id, req.rating, req.review)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PATCH /ratings/{id}: edit the caller's own rating.
#[tracing::instrument(skip(state, req))]
pub async fn edit<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RatingRequest>,
) -> Result<Json<RatingOutcome>, ApiError> {
    let rating_id: RatingId = parse_id(&id, "rating id")?;
    let outcome = state
        .ratings
        .edit(rating_id, caller.user_id, req.rating, req.review)
        .await?;
    Ok(Json(outcome))
}

/// DELETE /ratings/{id}: owners delete their own; administrators any.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let rating_id: RatingId = parse_id(&id, "rating id")?;
    let average_rating = if caller.is_admin() {
        state.ratings.delete(rating_id).await?
    } else {
        state.ratings.delete_own(rating_id, caller.user_id).await?
    };
    Ok(Json(DeletedResponse {
        message: format!("Rating {rating_id} deleted"),
        average_rating,
    }))
}

/// PATCH /ratings/{id}/moderation: approve or withdraw a rating.
#[tracing::instrument(skip(state, req))]
pub async fn moderate<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ModerationRequest>,
) -> Result<Json<RatingOutcome>, ApiError> {
    caller.require_admin()?;
    let rating_id: RatingId = parse_id(&id, "rating id")?;
    let outcome = state.ratings.moderate(rating_id, req.moderated).await?;
    Ok(Json(outcome))
}
