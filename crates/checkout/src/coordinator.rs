//! Checkout coordinator: turns a user's cart into a placed order.

use std::time::Instant;

use common::{CartItemId, OrderId, UserId};
use domain::{KeyedLocks, ShippingInfo};
use store::{CartItem, CartStore, NewOrder, NewOrderItem, OrderStore, StoreError, UserStore};

use crate::error::{CheckoutError, Result};
use crate::request::{CheckoutReceipt, CheckoutRequest, CheckoutWarning};
use crate::step::CheckoutStep;
use crate::unit_of_work::{Compensation, UnitOfWork};

/// Orchestrates checkout against a store.
///
/// The writes are not wrapped in a store transaction. Instead every write
/// that must be undone on failure registers a compensation, and a failure
/// while copying lines removes the order so a zero-item order never
/// persists. Checkouts for the same user run one at a time in this process,
/// and only the cart lines that were copied into the order are cleared.
pub struct CheckoutCoordinator<S> {
    store: S,
    locks: KeyedLocks<UserId>,
}

impl<S> CheckoutCoordinator<S>
where
    S: CartStore + OrderStore + UserStore,
{
    /// Creates a new checkout coordinator.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Shares per-user locks with the cart service so cart writes wait for
    /// a running checkout.
    pub fn with_user_locks(mut self, locks: KeyedLocks<UserId>) -> Self {
        self.locks = locks;
        self
    }

    /// Places an order from the user's cart.
    #[tracing::instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(user_id, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %receipt.order.id,
                    total = %receipt.order.total_price,
                    items = receipt.items.len(),
                    warnings = receipt.warnings.len(),
                    "checkout completed"
                );
            }
            Err(
                CheckoutError::EmptyCart(_)
                | CheckoutError::Validation(_)
                | CheckoutError::TotalOutOfRange(_),
            ) => {}
            Err(error) => tracing::warn!(%error, "checkout failed"),
        }
        result
    }

    async fn run(&self, user_id: UserId, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let shipping = ShippingInfo::parse(&request.shipping_info)?;

        let _guard = self.locks.lock(user_id).await;

        let cart = self
            .store
            .list_cart(user_id)
            .await
            .map_err(CheckoutError::at(CheckoutStep::LoadCart))?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart(user_id));
        }

        let total = CartItem::total(&cart).ok_or(CheckoutError::TotalOutOfRange(user_id))?;
        if let Some(client_total) = request.client_total
            && client_total != total
        {
            tracing::warn!(%client_total, %total, "client total differs from cart total");
        }

        let mut warnings = Vec::new();
        if request.update_address
            && let Some(warning) = self.update_address(user_id, &shipping).await
        {
            warnings.push(warning);
        }

        let order = self
            .store
            .insert_order(NewOrder {
                user_id,
                total_price: total,
                shipping_info: shipping.into_string(),
            })
            .await
            .map_err(CheckoutError::at(CheckoutStep::CreateOrder))?;

        let mut uow = UnitOfWork::begin();
        uow.register(Compensation::DeleteOrder(order.id));

        let mut items = Vec::with_capacity(cart.len());
        for line in &cart {
            match self
                .store
                .insert_order_item(order.id, NewOrderItem::from(line))
                .await
            {
                Ok(item) => items.push(item),
                Err(source) => {
                    return Err(self
                        .compensate(uow, order.id, CheckoutStep::CreateOrderItems, source)
                        .await);
                }
            }
        }
        uow.commit();

        let ordered: Vec<CartItemId> = cart.iter().map(|line| line.id).collect();
        if let Err(error) = self.store.clear_cart(user_id, &ordered).await {
            tracing::warn!(
                order_id = %order.id,
                step = %CheckoutStep::ClearCart,
                %error,
                "order placed but cart was not cleared"
            );
            warnings.push(CheckoutWarning::CartNotCleared(error.to_string()));
        }

        Ok(CheckoutReceipt {
            order,
            items,
            warnings,
        })
    }

    async fn update_address(
        &self,
        user_id: UserId,
        shipping: &ShippingInfo,
    ) -> Option<CheckoutWarning> {
        let address = shipping.address()?;

        let result = async {
            let current = self.store.get_address(user_id).await?;
            if current.as_deref() == Some(address) {
                return Ok::<_, StoreError>(false);
            }
            self.store.set_address(user_id, address).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => {
                tracing::debug!("stored address updated");
                None
            }
            Ok(false) => None,
            Err(error) => {
                tracing::warn!(step = %CheckoutStep::UpdateAddress, %error, "address not updated");
                Some(CheckoutWarning::AddressNotUpdated(error.to_string()))
            }
        }
    }

    async fn compensate(
        &self,
        uow: UnitOfWork,
        order_id: OrderId,
        step: CheckoutStep,
        source: StoreError,
    ) -> CheckoutError {
        metrics::counter!("checkout_compensated_total").increment(1);
        tracing::warn!(%order_id, %step, error = %source, "checkout step failed, compensating");

        match uow.rollback(&self.store).await {
            Ok(_) => CheckoutError::Persistence { step, source },
            Err(failure) => {
                tracing::error!(
                    %order_id,
                    %step,
                    error = %source,
                    compensation_error = %failure.error,
                    "compensation failed, order may persist without all items"
                );
                CheckoutError::CompensationFailed {
                    order_id,
                    step,
                    source,
                    compensation: failure.error,
                }
            }
        }
    }
}
