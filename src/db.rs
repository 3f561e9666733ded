use axum::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cart::models::Cart;
use crate::error::ApiError;
use crate::models::UpdateCartRequest;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Shared handle to the administrative cart persistence
pub type AdminCarts = Arc<dyn AdminCartStore>;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Persistence operations behind the administrative CRUD handlers
///
/// The handlers own the HTTP-facing decisions (NoFieldsToUpdate, conflict
/// and not-found mapping); implementations only move cart rows.
#[async_trait]
pub trait AdminCartStore: Send + Sync {
    /// All carts, newest first
    async fn list(&self) -> Result<Vec<Cart>, ApiError>;

    /// A single cart row by id
    async fn find(&self, id: Uuid) -> Result<Option<Cart>, ApiError>;

    /// Whether the user already has an Active cart
    async fn has_active(&self, user_id: i32) -> Result<bool, ApiError>;

    /// Insert an empty Active cart for the user
    async fn insert(&self, user_id: i32) -> Result<Cart, ApiError>;

    /// Apply the administrative changes; None when the cart does not exist
    async fn update(&self, id: Uuid, changes: &UpdateCartRequest) -> Result<Option<Cart>, ApiError>;

    /// Delete the cart row; false when the cart does not exist
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;
}

const CART_COLUMNS: &str = "id, user_id, status, subtotal, discount, total, \
                            applied_promo_code, promo_kind, promo_value, \
                            created_at, updated_at";

/// PostgreSQL-backed administrative store
pub struct PgAdminCartStore {
    pool: PgPool,
}

impl PgAdminCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminCartStore for PgAdminCartStore {
    async fn list(&self) -> Result<Vec<Cart>, ApiError> {
        let carts = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts ORDER BY created_at DESC",
            CART_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(carts)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Cart>, ApiError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts WHERE id = $1",
            CART_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cart)
    }

    async fn has_active(&self, user_id: i32) -> Result<bool, ApiError> {
        // Friendly pre-check; the partial unique index on
        // carts(user_id) WHERE status = 'active' remains the backstop.
        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM carts WHERE user_id = $1 AND status = 'active')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.unwrap_or(false))
    }

    async fn insert(&self, user_id: i32) -> Result<Cart, ApiError> {
        let cart = sqlx::query_as::<_, Cart>(&format!(
            "INSERT INTO carts (user_id) VALUES ($1) RETURNING {}",
            CART_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(cart)
    }

    async fn update(&self, id: Uuid, changes: &UpdateCartRequest) -> Result<Option<Cart>, ApiError> {
        // Transaction keeps the existence check and the update atomic
        let mut tx = self.pool.begin().await?;

        let existing = match sqlx::query_as::<_, Cart>(&format!(
            "SELECT {} FROM carts WHERE id = $1",
            CART_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        {
            Some(cart) => cart,
            None => return Ok(None),
        };

        let updated_cart = sqlx::query_as::<_, Cart>(&format!(
            "UPDATE carts SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            CART_COLUMNS
        ))
        .bind(changes.status.unwrap_or(existing.status))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(updated_cart))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
