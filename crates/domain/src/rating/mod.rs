//! Product ratings and the moderated average they feed.

mod average;
mod service;

pub use average::average_rating;
pub use service::{RatingOutcome, RatingService};

use common::{ProductId, RatingId, UserId};
use thiserror::Error;

/// Lowest accepted score.
pub const MIN_SCORE: i64 = 1;

/// Highest accepted score.
pub const MAX_SCORE: i64 = 5;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("Invalid rating: {0} (must be between {MIN_SCORE} and {MAX_SCORE})")]
    InvalidRating(i64),

    #[error("User {user_id} has already rated product {product_id}")]
    AlreadyRated {
        product_id: ProductId,
        user_id: UserId,
    },

    #[error("Rating not found: {0}")]
    NotFound(RatingId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Not allowed to modify rating {rating_id}")]
    Forbidden { rating_id: RatingId },
}

/// Checks a raw score against the accepted range.
pub fn validate_score(score: i64) -> Result<u8, RatingError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        u8::try_from(score).map_err(|_| RatingError::InvalidRating(score))
    } else {
        Err(RatingError::InvalidRating(score))
    }
}
