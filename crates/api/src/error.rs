//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{CartError, DomainError, OrderError, RatingError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Caller identity is missing or malformed.
    Unauthorized(String),
    /// Caller is known but lacks the rights for the operation.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Cart(cart_err) => match cart_err {
            CartError::InvalidQuantity { .. } | CartError::TotalOutOfRange => {
                StatusCode::BAD_REQUEST
            }
            CartError::ProductNotFound(_)
            | CartError::VariantNotFound { .. }
            | CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        },
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        },
        DomainError::Rating(rating_err) => match rating_err {
            RatingError::InvalidRating(_) => StatusCode::BAD_REQUEST,
            RatingError::AlreadyRated { .. } => StatusCode::CONFLICT,
            RatingError::NotFound(_) | RatingError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            RatingError::Forbidden { .. } => StatusCode::FORBIDDEN,
        },
        DomainError::Store(store_err) => store_error_status(store_err),
    };
    (status, err.to_string())
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match &err {
        CheckoutError::EmptyCart(_)
        | CheckoutError::Validation(_)
        | CheckoutError::TotalOutOfRange(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Persistence { .. } | CheckoutError::CompensationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

fn store_error_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::UniqueViolation { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
