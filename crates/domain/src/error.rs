//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;
use crate::rating::RatingError;
use crate::validation::ValidationError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input, rejected before any write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An error in a cart operation.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An error in an order operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error in a rating operation.
    #[error("Rating error: {0}")]
    Rating(#[from] RatingError),

    /// The store failed to complete a read or write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
