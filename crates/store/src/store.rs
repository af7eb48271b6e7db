use async_trait::async_trait;
use common::{CartItemId, Money, OrderId, ProductId, RatingId, UserId, VariantId};

use crate::Result;
use crate::record::{
    CartItem, NewCartItem, NewOrder, NewOrderItem, NewRating, Order, OrderItem, Product, Rating,
    RatingUpdate, StatusUpdate, Variant,
};

/// Catalog reads plus the one derived column the order core maintains.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product with an initial average rating of zero.
    async fn insert_product(&self, name: &str, price: Money) -> Result<Product>;

    /// Inserts a variant of an existing product.
    async fn insert_variant(&self, product_id: ProductId, name: &str, price: Money)
    -> Result<Variant>;

    /// Loads a product, `None` if absent.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Loads a variant, `None` if absent.
    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>>;

    /// Overwrites `average_rating`. Fails with `NotFound` for unknown products.
    async fn set_average_rating(&self, product_id: ProductId, average: f64) -> Result<()>;
}

/// Per-user cart lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart lines, oldest first.
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartItem>>;

    /// Loads a single cart line, `None` if absent.
    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>>;

    /// Finds the user's line for a (product, variant) pair.
    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>>;

    /// Inserts a new cart line.
    async fn insert_cart_item(&self, item: NewCartItem) -> Result<CartItem>;

    /// Sets the quantity of a line. Fails with `NotFound` for unknown lines.
    async fn update_cart_quantity(&self, cart_item_id: CartItemId, quantity: u32)
    -> Result<CartItem>;

    /// Deletes a line, returning whether it existed.
    async fn delete_cart_item(&self, cart_item_id: CartItemId) -> Result<bool>;

    /// Deletes the listed lines of the user's cart, returning how many were
    /// removed. Lines of other users and lines not listed are left alone.
    async fn clear_cart(&self, user_id: UserId, cart_item_ids: &[CartItemId]) -> Result<u64>;
}

/// Orders and their immutable lines.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a `PENDING`, unnumbered order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Inserts one line of an existing order.
    async fn insert_order_item(&self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem>;

    /// Loads an order, `None` if absent.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Returns the lines of an order in insertion order.
    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Returns the user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Writes the mutable part of an order. Fails with `NotFound` for unknown orders.
    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<Order>;

    /// Deletes an order together with its lines, returning whether it existed.
    async fn delete_order(&self, order_id: OrderId) -> Result<bool>;

    /// Draws the next value of the order-number sequence.
    async fn next_order_sequence(&self) -> Result<i64>;
}

/// Product ratings.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Inserts an unmoderated rating.
    ///
    /// At most one rating exists per (product, user); a second insert fails
    /// with `UniqueViolation` even when two inserts race.
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating>;

    /// Loads a rating, `None` if absent.
    async fn get_rating(&self, rating_id: RatingId) -> Result<Option<Rating>>;

    /// Finds the user's rating of a product.
    async fn find_rating(&self, product_id: ProductId, user_id: UserId) -> Result<Option<Rating>>;

    /// Overwrites the mutable fields. Fails with `NotFound` for unknown ratings.
    async fn update_rating(&self, rating_id: RatingId, update: RatingUpdate) -> Result<Rating>;

    /// Sets only the moderation flag, leaving score and review as stored.
    /// Fails with `NotFound` for unknown ratings.
    async fn set_moderated(&self, rating_id: RatingId, moderated: bool) -> Result<Rating>;

    /// Deletes a rating, returning whether it existed.
    async fn delete_rating(&self, rating_id: RatingId) -> Result<bool>;

    /// Returns the product's ratings, oldest first.
    async fn list_ratings(&self, product_id: ProductId, moderated_only: bool)
    -> Result<Vec<Rating>>;

    /// Returns the scores of the product's moderated ratings.
    async fn moderated_scores(&self, product_id: ProductId) -> Result<Vec<u8>>;
}

/// The user address book written as a side effect of checkout.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user's stored address, `None` if never set.
    async fn get_address(&self, user_id: UserId) -> Result<Option<String>>;

    /// Stores the user's address, replacing any previous one.
    async fn set_address(&self, user_id: UserId, address: &str) -> Result<()>;
}

/// Everything the order core needs from a backend.
pub trait Storefront:
    CatalogStore + CartStore + OrderStore + RatingStore + UserStore + Clone + 'static
{
}

impl<T> Storefront for T where
    T: CatalogStore + CartStore + OrderStore + RatingStore + UserStore + Clone + 'static
{
}
