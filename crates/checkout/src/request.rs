//! Checkout input and output types.

use common::Money;
use serde::{Deserialize, Serialize};
use store::{Order, OrderItem};

/// A checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Formatted `Key: value` shipping lines, stored verbatim on the order.
    pub shipping_info: String,
    /// The total the client believes it is paying. Advisory only.
    #[serde(default)]
    pub client_total: Option<Money>,
    /// Remember the `Address:` line as the user's address.
    #[serde(default)]
    pub update_address: bool,
}

impl CheckoutRequest {
    pub fn new(shipping_info: impl Into<String>) -> Self {
        Self {
            shipping_info: shipping_info.into(),
            ..Self::default()
        }
    }

    pub fn with_client_total(mut self, total: Money) -> Self {
        self.client_total = Some(total);
        self
    }

    pub fn updating_address(mut self) -> Self {
        self.update_address = true;
        self
    }
}

/// A degraded but accepted outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CheckoutWarning {
    /// The order stands but the cart still holds its lines.
    CartNotCleared(String),
    /// The order stands but the user's address was not saved.
    AddressNotUpdated(String),
}

impl std::fmt::Display for CheckoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutWarning::CartNotCleared(reason) => write!(f, "cart was not cleared: {reason}"),
            CheckoutWarning::AddressNotUpdated(reason) => {
                write!(f, "address was not updated: {reason}")
            }
        }
    }
}

/// A placed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CheckoutWarning>,
}
