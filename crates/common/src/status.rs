use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// ```text
/// Pending ──► Confirmed ──► Ready ──► Shipped ──► Completed
///    │            │           │          │
///    └────────────┴───────────┴──────────┴──► Canceled | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order placed, waiting for a human to confirm it.
    #[default]
    Pending,

    /// Confirmed by staff; the order number is assigned at this point.
    Confirmed,

    /// Packed and ready to hand over to a carrier.
    Ready,

    /// Handed over to a carrier.
    Shipped,

    /// Delivered (terminal state).
    Completed,

    /// Canceled (terminal state).
    Canceled,

    /// Could not be fulfilled (terminal state).
    Failed,
}

/// Returned when a string is not one of the seven known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    /// Every known status, in happy-path order followed by the failure exits.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Ready,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Canceled,
        OrderStatus::Failed,
    ];

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Canceled | OrderStatus::Failed
        )
    }

    /// Position on the linear happy path, `None` for the failure exits.
    pub fn happy_path_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Completed => Some(4),
            OrderStatus::Canceled | OrderStatus::Failed => None,
        }
    }

    /// Returns the wire/storage spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Ready => "READY",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
