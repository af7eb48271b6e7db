//! Cart service.

use common::{CartItemId, Money, ProductId, UserId, VariantId};
use serde::Serialize;
use store::{CartItem, CartStore, CatalogStore, NewCartItem};

use super::{CartError, MAX_QUANTITY};
use crate::error::DomainError;
use crate::locks::KeyedLocks;

/// A user's cart with its subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub subtotal: Money,
}

impl CartView {
    fn from_items(items: Vec<CartItem>) -> Result<Self, CartError> {
        let subtotal = CartItem::total(&items).ok_or(CartError::TotalOutOfRange)?;
        Ok(Self { items, subtotal })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Service for managing a user's cart.
///
/// Writes to one user's cart hold that user's lock. Checkout takes the same
/// lock when it is handed a clone of these locks, so a cart cannot change
/// between the snapshot checkout copies and the lines it clears.
pub struct CartService<S> {
    store: S,
    locks: KeyedLocks<UserId>,
}

impl<S> CartService<S>
where
    S: CartStore + CatalogStore,
{
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Uses `locks` for per-user serialization instead of a private set.
    pub fn with_user_locks(mut self, locks: KeyedLocks<UserId>) -> Self {
        self.locks = locks;
        self
    }

    /// Adds a product (or one of its variants) to the cart.
    ///
    /// The unit price is read from the catalog now and stored on the line.
    /// Adding a (product, variant) pair already in the cart increments the
    /// existing line and keeps its original price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, DomainError> {
        let quantity = check_quantity(u64::from(quantity))?;

        let unit_price = self.catalog_price(product_id, variant_id).await?;

        let _guard = self.locks.lock(user_id).await;
        if let Some(existing) = self
            .store
            .find_cart_line(user_id, product_id, variant_id)
            .await?
        {
            let quantity = check_quantity(u64::from(existing.quantity) + u64::from(quantity))?;
            return Ok(self
                .store
                .update_cart_quantity(existing.id, quantity)
                .await?);
        }

        let item = self
            .store
            .insert_cart_item(NewCartItem {
                user_id,
                product_id,
                variant_id,
                quantity,
                unit_price,
            })
            .await?;

        tracing::debug!(cart_item_id = %item.id, unit_price = %unit_price, "cart line added");
        Ok(item)
    }

    /// Sets a line's quantity. Zero removes the line and returns `None`.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<Option<CartItem>, DomainError> {
        if quantity > MAX_QUANTITY {
            return Err(CartError::InvalidQuantity {
                quantity: u64::from(quantity),
            }
            .into());
        }

        let _guard = self.locks.lock(user_id).await;
        self.owned_line(user_id, cart_item_id).await?;

        if quantity == 0 {
            self.store.delete_cart_item(cart_item_id).await?;
            return Ok(None);
        }

        Ok(Some(
            self.store
                .update_cart_quantity(cart_item_id, quantity)
                .await?,
        ))
    }

    /// Removes a line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<(), DomainError> {
        let _guard = self.locks.lock(user_id).await;
        self.owned_line(user_id, cart_item_id).await?;
        self.store.delete_cart_item(cart_item_id).await?;
        Ok(())
    }

    /// Returns the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartView, DomainError> {
        let items = self.store.list_cart(user_id).await?;
        Ok(CartView::from_items(items)?)
    }

    async fn catalog_price(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Money, DomainError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let Some(variant_id) = variant_id else {
            return Ok(product.price);
        };

        match self.store.get_variant(variant_id).await? {
            Some(variant) if variant.product_id == product_id => Ok(variant.price),
            _ => Err(CartError::VariantNotFound {
                product_id,
                variant_id,
            }
            .into()),
        }
    }

    async fn owned_line(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<CartItem, DomainError> {
        match self.store.get_cart_item(cart_item_id).await? {
            Some(item) if item.user_id == user_id => Ok(item),
            _ => Err(CartError::ItemNotFound(cart_item_id).into()),
        }
    }
}

fn check_quantity(quantity: u64) -> Result<u32, CartError> {
    match u32::try_from(quantity) {
        Ok(q) if (1..=MAX_QUANTITY).contains(&q) => Ok(q),
        _ => Err(CartError::InvalidQuantity { quantity }),
    }
}
