//! Order number allocation.

use async_trait::async_trait;
use store::{Order, OrderStore};

use crate::error::DomainError;

/// Produces a unique human-readable number for an order being confirmed.
#[async_trait]
pub trait OrderNumberAllocator: Send + Sync {
    async fn allocate(&self, order: &Order) -> Result<String, DomainError>;
}

/// Allocates `{prefix}-{YYYYMMDD}-{NNNNNN}` numbers from the store sequence.
///
/// The date is the order's creation date, so a number always reads the same
/// regardless of when the order was confirmed. Sequence values past six digits
/// simply widen the suffix.
#[derive(Debug, Clone)]
pub struct SequenceOrderNumbers<S> {
    store: S,
    prefix: String,
}

impl<S: OrderStore> SequenceOrderNumbers<S> {
    pub const DEFAULT_PREFIX: &'static str = "ORD";

    pub fn new(store: S) -> Self {
        Self::with_prefix(store, Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl<S: OrderStore> OrderNumberAllocator for SequenceOrderNumbers<S> {
    async fn allocate(&self, order: &Order) -> Result<String, DomainError> {
        let sequence = self.store.next_order_sequence().await?;
        Ok(format!(
            "{}-{}-{:06}",
            self.prefix,
            order.created_at.format("%Y%m%d"),
            sequence
        ))
    }
}
