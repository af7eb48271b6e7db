//! Checkout error types.

use common::{OrderId, UserId};
use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

use crate::step::CheckoutStep;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user has nothing in their cart.
    #[error("Cart is empty for user {0}")]
    EmptyCart(UserId),

    /// The cart total does not fit in a money amount.
    #[error("Cart total is out of range for user {0}")]
    TotalOutOfRange(UserId),

    /// The shipping text was rejected before any write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A step failed. Any order created so far has been removed.
    #[error("Checkout failed at {step}: {source}")]
    Persistence {
        step: CheckoutStep,
        #[source]
        source: StoreError,
    },

    /// A step failed and removing the partial order failed too.
    #[error(
        "Checkout failed at {step}: {source}; removing order {order_id} also failed: {compensation}"
    )]
    CompensationFailed {
        order_id: OrderId,
        step: CheckoutStep,
        #[source]
        source: StoreError,
        compensation: StoreError,
    },
}

impl CheckoutError {
    pub(crate) fn at(step: CheckoutStep) -> impl FnOnce(StoreError) -> CheckoutError {
        move |source| CheckoutError::Persistence { step, source }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
