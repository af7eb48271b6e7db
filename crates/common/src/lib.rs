//! Shared identifiers and value types for the storefront order core.

mod money;
mod status;
mod types;

pub use money::Money;
pub use status::{OrderStatus, UnknownStatus};
pub use types::{CartItemId, OrderId, OrderItemId, ProductId, RatingId, UserId, VariantId};
