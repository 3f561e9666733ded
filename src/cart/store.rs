use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::error::CartError;
use crate::cart::models::{Cart, CartLineItem, CartWithItems};

/// Persistence for the cart aggregate and its line items
///
/// `save` is atomic: it persists the cart row and makes its stored item set
/// exactly the given one, or changes nothing. Carts are always loaded with
/// their line items attached.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the user's Active cart with its items, if one exists
    async fn load_active(&self, user_id: i32) -> Result<Option<CartWithItems>, CartError>;

    /// Create a new empty Active cart for the user
    ///
    /// Fails with `Conflict` if the user already has an Active cart (the
    /// get-or-create race lost to a concurrent request).
    async fn create_active(&self, user_id: i32) -> Result<CartWithItems, CartError>;

    /// Persist the cart row and replace its item set with `items` atomically
    async fn save(&self, cart: &Cart, items: &[CartLineItem]) -> Result<(), CartError>;
}

/// Postgres-backed cart store
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn load_active(&self, user_id: i32) -> Result<Option<CartWithItems>, CartError> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, status, subtotal, discount, total,
                   applied_promo_code, promo_kind, promo_value,
                   created_at, updated_at
            FROM carts
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartLineItem>(
            r#"
            SELECT id, cart_id, product_id, quantity, unit_price_snapshot,
                   line_total, created_at
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(cart.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CartWithItems { cart, items }))
    }

    async fn create_active(&self, user_id: i32) -> Result<CartWithItems, CartError> {
        // The partial unique index on carts(user_id) WHERE status = 'active'
        // turns a lost get-or-create race into a Conflict here.
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (user_id)
            VALUES ($1)
            RETURNING id, user_id, status, subtotal, discount, total,
                      applied_promo_code, promo_kind, promo_value,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created active cart {} for user {}", cart.id, user_id);

        Ok(CartWithItems {
            cart,
            items: Vec::new(),
        })
    }

    async fn save(&self, cart: &Cart, items: &[CartLineItem]) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE carts
            SET subtotal = $1,
                discount = $2,
                total = $3,
                applied_promo_code = $4,
                promo_kind = $5,
                promo_value = $6,
                updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(cart.subtotal)
        .bind(cart.discount)
        .bind(cart.total)
        .bind(&cart.applied_promo_code)
        .bind(cart.promo_kind)
        .bind(cart.promo_value)
        .bind(cart.updated_at)
        .bind(cart.id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(CartError::DatabaseError(format!(
                "Cart {} vanished during save",
                cart.id
            )));
        }

        // Remove line items no longer in the set, then upsert the rest. The
        // unique index on (cart_id, product_id) catches racing inserts.
        let kept_ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id <> ALL($2)")
            .bind(cart.id)
            .bind(&kept_ids)
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO cart_items
                    (id, cart_id, product_id, quantity, unit_price_snapshot, line_total, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE
                SET quantity = EXCLUDED.quantity,
                    unit_price_snapshot = EXCLUDED.unit_price_snapshot,
                    line_total = EXCLUDED.line_total
                "#,
            )
            .bind(item.id)
            .bind(item.cart_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_snapshot)
            .bind(item.line_total)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}
