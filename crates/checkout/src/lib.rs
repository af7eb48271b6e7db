//! Checkout for the storefront order core.
//!
//! Converts a user's cart into an immutable order:
//! 1. Validate the shipping text and load the cart
//! 2. Optionally remember the shipping address
//! 3. Create the order and copy each cart line into it
//! 4. Clear the cart
//!
//! A failure while copying lines deletes the order again, so no order is
//! ever left without items.

pub mod coordinator;
pub mod error;
pub mod request;
pub mod step;
pub mod unit_of_work;

pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result};
pub use request::{CheckoutReceipt, CheckoutRequest, CheckoutWarning};
pub use step::CheckoutStep;
pub use unit_of_work::{Compensation, CompensationFailure, UnitOfWork};
