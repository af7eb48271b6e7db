//! Order status state machine, order-number allocation and order administration.

mod numbering;
mod service;
mod transition;

pub use numbering::{OrderNumberAllocator, SequenceOrderNumbers};
pub use service::{OrderDetails, OrderService, TransitionResult};
pub use transition::{TransitionOutcome, TransitionPlan, TransitionPolicy, plan_transition};

use common::{OrderId, OrderStatus};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested status is not one of the seven known values.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The transition policy rejected the move.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(OrderId),
}
