//! Checkout steps.

use serde::{Deserialize, Serialize};

/// The steps of a checkout, in execution order.
///
/// ```text
/// LoadCart ──► UpdateAddress ──► CreateOrder
///                                     │
///   ClearCart ◄── CreateOrderItems ◄──┘
/// ```
///
/// Only a failure in `CreateOrderItems` triggers compensation. A failed
/// `UpdateAddress` or `ClearCart` is reported as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    LoadCart,
    UpdateAddress,
    CreateOrder,
    CreateOrderItems,
    ClearCart,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::LoadCart => "load_cart",
            CheckoutStep::UpdateAddress => "update_address",
            CheckoutStep::CreateOrder => "create_order",
            CheckoutStep::CreateOrderItems => "create_order_items",
            CheckoutStep::ClearCart => "clear_cart",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
