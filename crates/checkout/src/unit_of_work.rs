//! Compensation tracking for multi-step checkout writes.

use common::OrderId;
use store::{OrderStore, StoreError};

/// An action that undoes a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Removes an order and every line already written for it.
    DeleteOrder(OrderId),
}

impl Compensation {
    async fn apply<S: OrderStore>(&self, store: &S) -> Result<(), StoreError> {
        match self {
            Compensation::DeleteOrder(order_id) => {
                store.delete_order(*order_id).await?;
                Ok(())
            }
        }
    }
}

/// A compensation that could not be applied.
#[derive(Debug)]
pub struct CompensationFailure {
    pub compensation: Compensation,
    pub error: StoreError,
}

/// Records the undo action of each completed step.
///
/// `commit` forgets the recorded actions; `rollback` applies them newest
/// first. Every action is attempted even when an earlier one fails.
#[derive(Debug, Default)]
#[must_use = "a unit of work must be committed or rolled back"]
pub struct UnitOfWork {
    compensations: Vec<Compensation>,
}

impl UnitOfWork {
    pub fn begin() -> Self {
        Self::default()
    }

    pub fn register(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    pub fn commit(self) {
        tracing::debug!(steps = self.compensations.len(), "unit of work committed");
    }

    /// Applies the recorded compensations in reverse order.
    ///
    /// Returns the number applied, or the first failure.
    pub async fn rollback<S: OrderStore>(self, store: &S) -> Result<usize, CompensationFailure> {
        let mut applied = 0;
        let mut first_failure = None;

        for compensation in self.compensations.into_iter().rev() {
            match compensation.apply(store).await {
                Ok(()) => {
                    applied += 1;
                    tracing::info!(?compensation, "compensation applied");
                }
                Err(error) => {
                    tracing::error!(?compensation, %error, "compensation failed");
                    first_failure.get_or_insert(CompensationFailure {
                        compensation,
                        error,
                    });
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(applied),
        }
    }
}
