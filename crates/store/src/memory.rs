use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    CartItemId, Money, OrderId, OrderItemId, OrderStatus, ProductId, RatingId, UserId, VariantId,
};
use tokio::sync::RwLock;

use crate::record::{
    CartItem, NewCartItem, NewOrder, NewOrderItem, NewRating, Order, OrderItem, Product, Rating,
    RatingUpdate, StatusUpdate, Variant,
};
use crate::store::{CartStore, CatalogStore, OrderStore, RatingStore, UserStore};
use crate::{Result, StoreError};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ListCart,
    ClearCart,
    InsertOrder,
    InsertOrderItem,
    DeleteOrder,
    UpdateOrderStatus,
    SetAddress,
    SetAverageRating,
    ModeratedScores,
}

#[derive(Debug, Default)]
struct MemoryState {
    products: Vec<Product>,
    variants: Vec<Variant>,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    ratings: Vec<Rating>,
    addresses: HashMap<UserId, String>,
    order_sequence: i64,
    failures: HashSet<FailPoint>,
    /// Number of order items that may still be inserted before `InsertOrderItem` fails.
    order_items_until_failure: Option<usize>,
}

impl MemoryState {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.failures.contains(&point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory store implementation for tests and local runs.
///
/// Behaves like the PostgreSQL store, including the (product, user)
/// uniqueness of ratings and the cascade from orders to their lines.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of the given operation fail until cleared.
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.write().await.failures.insert(point);
    }

    /// Stops injecting failures for the given operation.
    pub async fn clear_failure(&self, point: FailPoint) {
        let mut state = self.state.write().await;
        state.failures.remove(&point);
        if point == FailPoint::InsertOrderItem {
            state.order_items_until_failure = None;
        }
    }

    /// Lets `count` more order items through, then fails every further insert.
    pub async fn fail_order_items_after(&self, count: usize) {
        self.state.write().await.order_items_until_failure = Some(count);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of order lines stored.
    pub async fn order_item_count(&self) -> usize {
        self.state.read().await.order_items.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, name: &str, price: Money) -> Result<Product> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
            price,
            average_rating: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn insert_variant(
        &self,
        product_id: ProductId,
        name: &str,
        price: Money,
    ) -> Result<Variant> {
        let mut state = self.state.write().await;
        if !state.products.iter().any(|p| p.id == product_id) {
            return Err(StoreError::not_found("Product", product_id));
        }
        let variant = Variant {
            id: VariantId::new(),
            product_id,
            name: name.to_string(),
            price,
        };
        state.variants.push(variant.clone());
        Ok(variant)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == product_id).cloned())
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>> {
        let state = self.state.read().await;
        Ok(state.variants.iter().find(|v| v.id == variant_id).cloned())
    }

    async fn set_average_rating(&self, product_id: ProductId, average: f64) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::SetAverageRating)?;
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| StoreError::not_found("Product", product_id))?;
        product.average_rating = average;
        product.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let state = self.state.read().await;
        state.check(FailPoint::ListCart)?;
        Ok(state
            .cart
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>> {
        let state = self.state.read().await;
        Ok(state.cart.iter().find(|item| item.id == cart_item_id).cloned())
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>> {
        let state = self.state.read().await;
        Ok(state
            .cart
            .iter()
            .find(|item| {
                item.user_id == user_id
                    && item.product_id == product_id
                    && item.variant_id == variant_id
            })
            .cloned())
    }

    async fn insert_cart_item(&self, item: NewCartItem) -> Result<CartItem> {
        let now = Utc::now();
        let item = CartItem {
            id: CartItemId::new(),
            user_id: item.user_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.cart.push(item.clone());
        Ok(item)
    }

    async fn update_cart_quantity(
        &self,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem> {
        let mut state = self.state.write().await;
        let item = state
            .cart
            .iter_mut()
            .find(|item| item.id == cart_item_id)
            .ok_or_else(|| StoreError::not_found("CartItem", cart_item_id))?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete_cart_item(&self, cart_item_id: CartItemId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.cart.len();
        state.cart.retain(|item| item.id != cart_item_id);
        Ok(state.cart.len() != before)
    }

    async fn clear_cart(&self, user_id: UserId, cart_item_ids: &[CartItemId]) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check(FailPoint::ClearCart)?;
        let before = state.cart.len();
        state
            .cart
            .retain(|item| item.user_id != user_id || !cart_item_ids.contains(&item.id));
        Ok((before - state.cart.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;
        state.check(FailPoint::InsertOrder)?;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id: order.user_id,
            total_price: order.total_price,
            shipping_info: order.shipping_info,
            status: OrderStatus::Pending,
            order_number: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_order_item(&self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem> {
        let mut state = self.state.write().await;
        state.check(FailPoint::InsertOrderItem)?;
        if let Some(remaining) = state.order_items_until_failure {
            if remaining == 0 {
                return Err(StoreError::Unavailable(
                    "injected failure at InsertOrderItem".to_string(),
                ));
            }
            state.order_items_until_failure = Some(remaining - 1);
        }
        if !state.orders.iter().any(|o| o.id == order_id) {
            return Err(StoreError::not_found("Order", order_id));
        }
        let item = OrderItem {
            id: OrderItemId::new(),
            order_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: item.price,
        };
        state.order_items.push(item.clone());
        Ok(item)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        Ok(state
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().rev().cloned().collect())
    }

    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<Order> {
        let mut state = self.state.write().await;
        state.check(FailPoint::UpdateOrderStatus)?;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| StoreError::not_found("Order", order_id))?;
        order.status = update.status;
        order.order_number = update.order_number;
        order.updated_at = update.updated_at;
        Ok(order.clone())
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check(FailPoint::DeleteOrder)?;
        let before = state.orders.len();
        state.orders.retain(|o| o.id != order_id);
        state.order_items.retain(|item| item.order_id != order_id);
        Ok(state.orders.len() != before)
    }

    async fn next_order_sequence(&self) -> Result<i64> {
        let mut state = self.state.write().await;
        state.order_sequence += 1;
        Ok(state.order_sequence)
    }
}

#[async_trait]
impl RatingStore for InMemoryStore {
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
        let mut state = self.state.write().await;
        if state
            .ratings
            .iter()
            .any(|r| r.product_id == rating.product_id && r.user_id == rating.user_id)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "ratings_product_user_key".to_string(),
            });
        }
        let now = Utc::now();
        let rating = Rating {
            id: RatingId::new(),
            product_id: rating.product_id,
            user_id: rating.user_id,
            rating: rating.rating,
            review: rating.review,
            moderated: false,
            created_at: now,
            updated_at: now,
        };
        state.ratings.push(rating.clone());
        Ok(rating)
    }

    async fn get_rating(&self, rating_id: RatingId) -> Result<Option<Rating>> {
        let state = self.state.read().await;
        Ok(state.ratings.iter().find(|r| r.id == rating_id).cloned())
    }

    async fn find_rating(&self, product_id: ProductId, user_id: UserId) -> Result<Option<Rating>> {
        let state = self.state.read().await;
        Ok(state
            .ratings
            .iter()
            .find(|r| r.product_id == product_id && r.user_id == user_id)
            .cloned())
    }

    async fn update_rating(&self, rating_id: RatingId, update: RatingUpdate) -> Result<Rating> {
        let mut state = self.state.write().await;
        let rating = state
            .ratings
            .iter_mut()
            .find(|r| r.id == rating_id)
            .ok_or_else(|| StoreError::not_found("Rating", rating_id))?;
        rating.rating = update.rating;
        rating.review = update.review;
        rating.moderated = update.moderated;
        rating.updated_at = Utc::now();
        Ok(rating.clone())
    }

    async fn set_moderated(&self, rating_id: RatingId, moderated: bool) -> Result<Rating> {
        let mut state = self.state.write().await;
        let rating = state
            .ratings
            .iter_mut()
            .find(|r| r.id == rating_id)
            .ok_or_else(|| StoreError::not_found("Rating", rating_id))?;
        rating.moderated = moderated;
        rating.updated_at = Utc::now();
        Ok(rating.clone())
    }

    async fn delete_rating(&self, rating_id: RatingId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.ratings.len();
        state.ratings.retain(|r| r.id != rating_id);
        Ok(state.ratings.len() != before)
    }

    async fn list_ratings(
        &self,
        product_id: ProductId,
        moderated_only: bool,
    ) -> Result<Vec<Rating>> {
        let state = self.state.read().await;
        Ok(state
            .ratings
            .iter()
            .filter(|r| r.product_id == product_id && (r.moderated || !moderated_only))
            .cloned()
            .collect())
    }

    async fn moderated_scores(&self, product_id: ProductId) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        state.check(FailPoint::ModeratedScores)?;
        Ok(state
            .ratings
            .iter()
            .filter(|r| r.product_id == product_id && r.moderated)
            .map(|r| r.rating)
            .collect())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_address(&self, user_id: UserId) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.addresses.get(&user_id).cloned())
    }

    async fn set_address(&self, user_id: UserId, address: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::SetAddress)?;
        state.addresses.insert(user_id, address.to_string());
        Ok(())
    }
}
