//! Relational persistence for the storefront order core.
//!
//! Repository traits are split per table group ([`CartStore`], [`OrderStore`],
//! [`RatingStore`], [`CatalogStore`], [`UserStore`]) and bundled by
//! [`Storefront`]. Two backends implement all of them: [`InMemoryStore`] for
//! tests and local runs, and [`PostgresStore`] on top of sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{FailPoint, InMemoryStore};
pub use postgres::PostgresStore;
pub use record::{
    CartItem, NewCartItem, NewOrder, NewOrderItem, NewRating, Order, OrderItem, Product, Rating,
    RatingUpdate, StatusUpdate, Variant,
};
pub use store::{CartStore, CatalogStore, OrderStore, RatingStore, Storefront, UserStore};
