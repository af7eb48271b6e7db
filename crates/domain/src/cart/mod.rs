//! Per-user cart lines with add-time price capture.

mod service;

pub use service::{CartService, CartView};

use common::{CartItemId, ProductId, VariantId};
use thiserror::Error;

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: u32 = 10_000;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// A line quantity outside `1..=MAX_QUANTITY`, including after merging.
    #[error("Invalid quantity: {quantity} (must be between 1 and {MAX_QUANTITY})")]
    InvalidQuantity { quantity: u64 },

    /// The cart's subtotal does not fit in a money amount.
    #[error("Cart total is out of range")]
    TotalOutOfRange,

    /// The product is not in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The variant does not exist or belongs to another product.
    #[error("Variant {variant_id} not found for product {product_id}")]
    VariantNotFound {
        product_id: ProductId,
        variant_id: VariantId,
    },

    /// The line does not exist in the caller's cart.
    #[error("Cart item not found: {0}")]
    ItemNotFound(CartItemId),
}
