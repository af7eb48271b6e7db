//! Rows persisted by the store.
//!
//! Prices on cart lines and order lines are snapshots: they are written once
//! and never re-derived from the catalog.

use chrono::{DateTime, Utc};
use common::{
    CartItemId, Money, OrderId, OrderItemId, OrderStatus, ProductId, RatingId, UserId, VariantId,
};
use serde::{Deserialize, Serialize};

/// A catalog product. Only the fields the order core reads or maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    /// Mean of moderated ratings, `0.0` when there are none.
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variant of a product with its own price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
}

/// A line in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    /// Price captured when the line was first added.
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns `unit_price * quantity`, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }

    /// Sums the line totals of `items`, `None` on overflow.
    pub fn total(items: &[CartItem]) -> Option<Money> {
        items.iter().try_fold(Money::ZERO, |total, item| {
            total.checked_add(item.line_total()?)
        })
    }
}

/// Values for a new cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Money,
    pub shipping_info: String,
    pub status: OrderStatus,
    pub order_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new order. Orders always start `PENDING` and unnumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_price: Money,
    pub shipping_info: String,
}

/// The mutable part of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub order_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// Returns `price * quantity`, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// Values for a new order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Money,
}

impl From<&CartItem> for NewOrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: item.unit_price,
        }
    }
}

/// A user's rating of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    pub review: Option<String>,
    pub moderated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new rating. New ratings are always unmoderated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRating {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    pub review: Option<String>,
}

/// Replacement values for the mutable fields of a rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingUpdate {
    pub rating: u8,
    pub review: Option<String>,
    pub moderated: bool,
}
