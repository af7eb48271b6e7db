//! Order service: status transitions, lookups and administrative deletion.

use chrono::Utc;
use common::{OrderId, OrderStatus, UserId};
use serde::Serialize;
use store::{Order, OrderItem, OrderStore, StatusUpdate};

use super::{
    OrderError, OrderNumberAllocator, SequenceOrderNumbers, TransitionOutcome, TransitionPolicy,
    plan_transition,
};
use crate::error::DomainError;
use crate::locks::KeyedLocks;

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Result of a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub order: Order,
    pub outcome: TransitionOutcome,
    pub message: String,
}

/// Service for managing placed orders.
///
/// Transitions on the same order are serialized in-process so a repeated
/// confirmation cannot allocate two numbers.
pub struct OrderService<S, N = SequenceOrderNumbers<S>> {
    store: S,
    numbers: N,
    policy: TransitionPolicy,
    locks: KeyedLocks<OrderId>,
}

impl<S> OrderService<S>
where
    S: OrderStore + Clone,
{
    /// Creates a new order service numbering orders from the store sequence.
    pub fn new(store: S) -> Self {
        let numbers = SequenceOrderNumbers::new(store.clone());
        Self {
            store,
            numbers,
            policy: TransitionPolicy::default(),
            locks: KeyedLocks::new(),
        }
    }
}

impl<S, N> OrderService<S, N>
where
    S: OrderStore,
    N: OrderNumberAllocator,
{
    /// Replaces the order number allocator.
    pub fn with_allocator<M: OrderNumberAllocator>(self, numbers: M) -> OrderService<S, M> {
        OrderService {
            store: self.store,
            numbers,
            policy: self.policy,
            locks: self.locks,
        }
    }

    /// Sets the transition policy.
    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Moves an order to the status named by `requested`.
    ///
    /// The name must match one of the seven statuses exactly.
    pub async fn transition(
        &self,
        order_id: OrderId,
        requested: &str,
    ) -> Result<TransitionResult, DomainError> {
        let status: OrderStatus = requested
            .parse()
            .map_err(|_| OrderError::InvalidStatus(requested.to_string()))?;
        self.transition_to(order_id, status).await
    }

    /// Moves an order to `requested`, allocating its order number on the
    /// first `PENDING -> CONFIRMED` move.
    #[tracing::instrument(skip(self))]
    pub async fn transition_to(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
    ) -> Result<TransitionResult, DomainError> {
        let _guard = self.locks.lock(order_id).await;

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let plan = plan_transition(&order, requested, self.policy)?;

        let order_number = if plan.allocate_number {
            Some(self.numbers.allocate(&order).await?)
        } else {
            order.order_number.clone()
        };

        let from = order.status;
        let order = self
            .store
            .update_order_status(
                order_id,
                StatusUpdate {
                    status: plan.next,
                    order_number,
                    updated_at: Utc::now(),
                },
            )
            .await?;

        let outcome = plan.outcome();
        let message = outcome.message(order.status, order.order_number.as_deref());

        metrics::counter!("order_status_transitions_total", "status" => order.status.as_str())
            .increment(1);
        tracing::info!(
            %order_id,
            %from,
            to = %order.status,
            order_number = order.order_number.as_deref().unwrap_or(""),
            "order status updated"
        );

        Ok(TransitionResult {
            order,
            outcome,
            message,
        })
    }

    /// Returns an order with its items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderDetails, DomainError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// Returns a user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Returns every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders().await?)
    }

    /// Permanently removes an order and its items.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<String, DomainError> {
        let _guard = self.locks.lock(order_id).await;
        if !self.store.delete_order(order_id).await? {
            return Err(OrderError::NotFound(order_id).into());
        }
        tracing::info!(%order_id, "order deleted");
        Ok(format!("Order {order_id} deleted"))
    }
}
