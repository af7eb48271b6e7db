//! Domain layer for the storefront order core.
//!
//! This crate holds the rules that sit on top of the store:
//! - Cart management with add-time price capture
//! - The order status state machine with lazy order numbering
//! - The rating maintainer that keeps a product's moderated average current

pub mod cart;
pub mod error;
pub mod locks;
pub mod order;
pub mod rating;
pub mod validation;

pub use cart::{CartError, CartService, CartView, MAX_QUANTITY};
pub use error::DomainError;
pub use locks::KeyedLocks;
pub use order::{
    OrderDetails, OrderError, OrderNumberAllocator, OrderService, SequenceOrderNumbers,
    TransitionOutcome, TransitionPlan, TransitionPolicy, TransitionResult, plan_transition,
};
pub use rating::{RatingError, RatingOutcome, RatingService, average_rating};
pub use validation::{ShippingInfo, ValidationError, normalize_review};
