//! Order status transition rules.

use common::OrderStatus;
use store::Order;

use super::OrderError;

/// How strictly status requests are checked against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any known status is accepted from any status.
    #[default]
    Permissive,

    /// Terminal statuses are final, `CANCELED`/`FAILED` are reachable from
    /// any other status, and otherwise the order only moves forward along
    /// the happy path. Re-requesting the current status is accepted.
    ForwardOnly,
}

impl TransitionPolicy {
    /// Returns true if the policy lets an order move from `from` to `to`.
    pub fn allows(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::ForwardOnly => {
                if from == to {
                    return true;
                }
                if from.is_terminal() {
                    return false;
                }
                match (from.happy_path_rank(), to.happy_path_rank()) {
                    (_, None) => true,
                    (Some(current), Some(next)) => next > current,
                    (None, Some(_)) => false,
                }
            }
        }
    }

    /// Returns the configuration spelling of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Permissive => "permissive",
            TransitionPolicy::ForwardOnly => "forward-only",
        }
    }
}

impl std::fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward-only" | "forward_only" => Ok(TransitionPolicy::ForwardOnly),
            other => Err(format!("unknown order status policy: {other}")),
        }
    }
}

/// What a transition did, used to build the caller-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status (and `updated_at`) written, nothing else changed.
    StatusUpdated,

    /// Order moved from `PENDING` to `CONFIRMED` and received its number.
    ConfirmedAndNumbered,
}

impl TransitionOutcome {
    /// Human-readable description of the transition.
    pub fn message(&self, status: OrderStatus, order_number: Option<&str>) -> String {
        match (self, order_number) {
            (TransitionOutcome::ConfirmedAndNumbered, Some(number)) => {
                format!("Order confirmed, order number {number} assigned")
            }
            _ => format!("Order status updated to {status}"),
        }
    }
}

/// The validated effect of a status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub next: OrderStatus,
    /// True only for `PENDING -> CONFIRMED` on an unnumbered order.
    pub allocate_number: bool,
}

impl TransitionPlan {
    pub fn outcome(&self) -> TransitionOutcome {
        if self.allocate_number {
            TransitionOutcome::ConfirmedAndNumbered
        } else {
            TransitionOutcome::StatusUpdated
        }
    }
}

/// Validates a status request against the order's current state.
pub fn plan_transition(
    order: &Order,
    requested: OrderStatus,
    policy: TransitionPolicy,
) -> Result<TransitionPlan, OrderError> {
    if !policy.allows(order.status, requested) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: requested,
        });
    }

    let allocate_number = order.status == OrderStatus::Pending
        && requested == OrderStatus::Confirmed
        && order.order_number.is_none();

    Ok(TransitionPlan {
        next: requested,
        allocate_number,
    })
}
