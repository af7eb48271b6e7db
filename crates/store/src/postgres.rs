use async_trait::async_trait;
use chrono::Utc;
use common::{
    CartItemId, Money, OrderId, OrderItemId, OrderStatus, ProductId, RatingId, UserId, VariantId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::record::{
    CartItem, NewCartItem, NewOrder, NewOrderItem, NewRating, Order, OrderItem, Product, Rating,
    RatingUpdate, StatusUpdate, Variant,
};
use crate::store::{CartStore, CatalogStore, OrderStore, RatingStore, UserStore};
use crate::{Result, StoreError};

const CART_COLUMNS: &str =
    "id, user_id, product_id, variant_id, quantity, unit_price_cents, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, shipping_info, status, order_number, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, variant_id, quantity, price_cents";
const RATING_COLUMNS: &str =
    "id, product_id, user_id, rating, review, moderated, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            average_rating: row.try_get("average_rating")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_variant(row: PgRow) -> Result<Variant> {
        Ok(Variant {
            id: VariantId::from_uuid(row.try_get("id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
        Ok(CartItem {
            id: CartItemId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            variant_id: row
                .try_get::<Option<Uuid>, _>("variant_id")?
                .map(VariantId::from_uuid),
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get("id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            shipping_info: row.try_get("shipping_info")?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            order_number: row.try_get("order_number")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get("id")?),
            order_id: OrderId::from_uuid(row.try_get("order_id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            variant_id: row
                .try_get::<Option<Uuid>, _>("variant_id")?
                .map(VariantId::from_uuid),
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn row_to_rating(row: PgRow) -> Result<Rating> {
        Ok(Rating {
            id: RatingId::from_uuid(row.try_get("id")?),
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            rating: score_from_db(row.try_get("rating")?)?,
            review: row.try_get("review")?,
            moderated: row.try_get("moderated")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn quantity_from_db(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative quantity {value}")))
}

fn quantity_to_db(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::InvalidData(format!("quantity {value} too large")))
}

fn score_from_db(value: i16) -> Result<u8> {
    u8::try_from(value).map_err(|_| StoreError::InvalidData(format!("rating {value} out of range")))
}

/// Maps constraint violations on writes to their store-level meaning.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        };
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_product(&self, name: &str, price: Money) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, average_rating, created_at, updated_at)
            VALUES ($1, $2, $3, 0, NOW(), NOW())
            RETURNING id, name, price_cents, average_rating, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(price.cents())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn insert_variant(
        &self,
        product_id: ProductId,
        name: &str,
        price: Money,
    ) -> Result<Variant> {
        let row = sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, name, price_cents)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, name, price_cents
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id.as_uuid())
        .bind(name)
        .bind(price.cents())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::not_found("Product", product_id);
            }
            StoreError::Database(e)
        })?;

        Self::row_to_variant(row)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, average_rating, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<Variant>> {
        let row = sqlx::query(
            "SELECT id, product_id, name, price_cents FROM product_variants WHERE id = $1",
        )
        .bind(variant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_variant).transpose()
    }

    async fn set_average_rating(&self, product_id: ProductId, average: f64) -> Result<()> {
        let result =
            sqlx::query("UPDATE products SET average_rating = $2, updated_at = NOW() WHERE id = $1")
                .bind(product_id.as_uuid())
                .bind(average)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", product_id));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn list_cart(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_cart_item).collect()
    }

    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1"))
            .bind(cart_item_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart_item).transpose()
    }

    async fn find_cart_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {CART_COLUMNS} FROM cart_items
            WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(variant_id.map(|v| v.as_uuid()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_item).transpose()
    }

    async fn insert_cart_item(&self, item: NewCartItem) -> Result<CartItem> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items ({CART_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(item.user_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.variant_id.map(|v| v.as_uuid()))
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.unit_price.cents())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_cart_item(row)
    }

    async fn update_cart_quantity(
        &self,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE cart_items SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(cart_item_id.as_uuid())
        .bind(quantity_to_db(quantity)?)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart_item)
            .transpose()?
            .ok_or_else(|| StoreError::not_found("CartItem", cart_item_id))
    }

    async fn delete_cart_item(&self, cart_item_id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(cart_item_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId, cart_item_ids: &[CartItemId]) -> Result<u64> {
        let ids: Vec<Uuid> = cart_item_ids.iter().map(|id| id.as_uuid()).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id.as_uuid())
            .bind(&ids)
            .execute(&self.pool)
            .await?;
        tracing::debug!(%user_id, removed = result.rows_affected(), "cart lines cleared");
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, NULL, $6, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order.user_id.as_uuid())
        .bind(order.total_price.cents())
        .bind(&order.shipping_info)
        .bind(OrderStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        let order = Self::row_to_order(row)?;
        tracing::debug!(order_id = %order.id, "order row inserted");
        Ok(order)
    }

    async fn insert_order_item(&self, order_id: OrderId, item: NewOrderItem) -> Result<OrderItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO order_items ({ORDER_ITEM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.variant_id.map(|v| v.as_uuid()))
        .bind(quantity_to_db(item.quantity)?)
        .bind(item.price.cents())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StoreError::not_found("Order", order_id);
            }
            map_write_error(e)
        })?;

        Self::row_to_order_item(row)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_status(&self, order_id: OrderId, update: StatusUpdate) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, order_number = $3, updated_at = $4
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id.as_uuid())
        .bind(update.status.as_str())
        .bind(&update.order_number)
        .bind(update.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(Self::row_to_order)
            .transpose()?
            .ok_or_else(|| StoreError::not_found("Order", order_id))
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await?;
        tracing::debug!(%order_id, deleted = result.rows_affected(), "order row deleted");
        Ok(result.rows_affected() > 0)
    }

    async fn next_order_sequence(&self) -> Result<i64> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl RatingStore for PostgresStore {
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO ratings ({RATING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING {RATING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(rating.product_id.as_uuid())
        .bind(rating.user_id.as_uuid())
        .bind(i16::from(rating.rating))
        .bind(&rating.review)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_rating(row)
    }

    async fn get_rating(&self, rating_id: RatingId) -> Result<Option<Rating>> {
        let row = sqlx::query(&format!("SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1"))
            .bind(rating_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_rating).transpose()
    }

    async fn find_rating(&self, product_id: ProductId, user_id: UserId) -> Result<Option<Rating>> {
        let row = sqlx::query(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE product_id = $1 AND user_id = $2"
        ))
        .bind(product_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_rating).transpose()
    }

    async fn update_rating(&self, rating_id: RatingId, update: RatingUpdate) -> Result<Rating> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE ratings SET rating = $2, review = $3, moderated = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {RATING_COLUMNS}
            "#
        ))
        .bind(rating_id.as_uuid())
        .bind(i16::from(update.rating))
        .bind(&update.review)
        .bind(update.moderated)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_rating)
            .transpose()?
            .ok_or_else(|| StoreError::not_found("Rating", rating_id))
    }

    async fn set_moderated(&self, rating_id: RatingId, moderated: bool) -> Result<Rating> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE ratings SET moderated = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {RATING_COLUMNS}
            "#
        ))
        .bind(rating_id.as_uuid())
        .bind(moderated)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_rating)
            .transpose()?
            .ok_or_else(|| StoreError::not_found("Rating", rating_id))
    }

    async fn delete_rating(&self, rating_id: RatingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(rating_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_ratings(
        &self,
        product_id: ProductId,
        moderated_only: bool,
    ) -> Result<Vec<Rating>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RATING_COLUMNS} FROM ratings
            WHERE product_id = $1 AND (moderated OR NOT $2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(moderated_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_rating).collect()
    }

    async fn moderated_scores(&self, product_id: ProductId) -> Result<Vec<u8>> {
        let scores: Vec<i16> =
            sqlx::query_scalar("SELECT rating FROM ratings WHERE product_id = $1 AND moderated")
                .bind(product_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        scores.into_iter().map(score_from_db).collect()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn get_address(&self, user_id: UserId) -> Result<Option<String>> {
        let address: Option<String> =
            sqlx::query_scalar("SELECT address FROM user_addresses WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(address)
    }

    async fn set_address(&self, user_id: UserId, address: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_addresses (user_id, address, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET address = EXCLUDED.address, updated_at = NOW()
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
