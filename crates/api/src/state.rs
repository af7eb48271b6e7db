//! Shared application state.

use checkout::CheckoutCoordinator;
use domain::{CartService, KeyedLocks, OrderService, RatingService, TransitionPolicy};
use store::Storefront;

/// Services shared by all handlers, built over one store.
pub struct AppState<S: Storefront> {
    pub cart: CartService<S>,
    pub checkout: CheckoutCoordinator<S>,
    pub orders: OrderService<S>,
    pub ratings: RatingService<S>,
}

impl<S: Storefront> AppState<S> {
    /// Cart writes and checkout serialize on the same per-user locks.
    pub fn new(store: S, policy: TransitionPolicy) -> Self {
        let user_locks = KeyedLocks::new();
        Self {
            cart: CartService::new(store.clone()).with_user_locks(user_locks.clone()),
            checkout: CheckoutCoordinator::new(store.clone()).with_user_locks(user_locks),
            orders: OrderService::new(store.clone()).with_policy(policy),
            ratings: RatingService::new(store),
        }
    }
}
