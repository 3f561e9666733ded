use axum::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::cart::error::CartError;
use crate::cart::models::{DiscountKind, DiscountRule};

/// Current catalog data for a product, as returned by the price oracle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub is_active: bool,
}

/// Outcome of resolving a promo code against the promotion catalog
#[derive(Debug, Clone, PartialEq)]
pub enum PromoLookup {
    Valid(DiscountRule),
    Expired,
    NotFound,
}

/// Read-only view of the product catalog's current price and purchasability
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price_of(&self, product_id: i32) -> Result<Option<PriceQuote>, CartError>;
}

/// Read-only view of the promotion catalog
#[async_trait]
pub trait PromotionOracle: Send + Sync {
    async fn resolve(&self, code: &str) -> Result<PromoLookup, CartError>;
}

/// Price oracle backed by the `products` table
#[derive(Clone)]
pub struct PgPriceOracle {
    pool: PgPool,
}

impl PgPriceOracle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceOracle for PgPriceOracle {
    async fn price_of(&self, product_id: i32) -> Result<Option<PriceQuote>, CartError> {
        let row: Option<(Decimal, bool)> = sqlx::query_as(
            "SELECT price, is_active FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(unit_price, is_active)| PriceQuote {
            unit_price,
            is_active,
        }))
    }
}

/// Promotion row as read from the `promotions` table
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    kind: DiscountKind,
    value: Decimal,
    is_active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

/// Promotion oracle backed by the `promotions` table
#[derive(Clone)]
pub struct PgPromotionOracle {
    pool: PgPool,
}

impl PgPromotionOracle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromotionOracle for PgPromotionOracle {
    async fn resolve(&self, code: &str) -> Result<PromoLookup, CartError> {
        let row: Option<PromotionRow> = sqlx::query_as(
            r#"
            SELECT kind, value, is_active, starts_at, ends_at
            FROM promotions
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(promo) = row else {
            return Ok(PromoLookup::NotFound);
        };

        let now = Utc::now();
        let started = promo.starts_at.map_or(true, |starts_at| starts_at <= now);
        let ended = promo.ends_at.map_or(false, |ends_at| ends_at < now);

        if !promo.is_active || !started || ended {
            tracing::debug!("Promo code '{}' is outside its validity window", code);
            return Ok(PromoLookup::Expired);
        }

        Ok(PromoLookup::Valid(DiscountRule {
            kind: promo.kind,
            value: promo.value,
        }))
    }
}
