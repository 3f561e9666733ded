// In-memory test doubles for the cart store and oracles.
// Shared by the service unit tests and the HTTP-level tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cart::error::CartError;
use crate::cart::models::{Cart, CartLineItem, CartStatus, CartWithItems, DiscountRule};
use crate::cart::oracle::{PriceOracle, PriceQuote, PromoLookup, PromotionOracle};
use crate::cart::store::CartStore;

/// In-memory cart store enforcing the same uniqueness rules as Postgres
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<Uuid, CartWithItems>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of carts ever created, across all users and statuses
    pub async fn cart_count(&self) -> usize {
        self.carts.lock().await.len()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load_active(&self, user_id: i32) -> Result<Option<CartWithItems>, CartError> {
        let carts = self.carts.lock().await;
        Ok(carts
            .values()
            .find(|entry| entry.cart.user_id == user_id && entry.cart.status == CartStatus::Active)
            .cloned())
    }

    async fn create_active(&self, user_id: i32) -> Result<CartWithItems, CartError> {
        let mut carts = self.carts.lock().await;
        let already_active = carts
            .values()
            .any(|entry| entry.cart.user_id == user_id && entry.cart.status == CartStatus::Active);
        if already_active {
            return Err(CartError::Conflict(format!(
                "duplicate active cart for user {}",
                user_id
            )));
        }

        let now = Utc::now();
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id,
            status: CartStatus::Active,
            subtotal: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
            applied_promo_code: None,
            promo_kind: None,
            promo_value: None,
            created_at: now,
            updated_at: now,
        };
        let entry = CartWithItems {
            cart,
            items: Vec::new(),
        };
        carts.insert(entry.cart.id, entry.clone());
        Ok(entry)
    }

    async fn save(&self, cart: &Cart, items: &[CartLineItem]) -> Result<(), CartError> {
        let mut carts = self.carts.lock().await;
        let entry = carts
            .get_mut(&cart.id)
            .ok_or_else(|| CartError::DatabaseError(format!("Cart {} vanished", cart.id)))?;

        let mut seen = std::collections::HashSet::new();
        for item in items {
            if !seen.insert(item.product_id) {
                return Err(CartError::Conflict(format!(
                    "duplicate product {} in cart {}",
                    item.product_id, cart.id
                )));
            }
        }

        entry.cart = cart.clone();
        entry.items = items.to_vec();
        Ok(())
    }
}

/// Price oracle over a fixed, mutable price table
#[derive(Default)]
pub struct FixedPrices {
    prices: Mutex<HashMap<i32, PriceQuote>>,
}

impl FixedPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, product_id: i32, unit_price: Decimal, is_active: bool) {
        self.prices.lock().await.insert(
            product_id,
            PriceQuote {
                unit_price,
                is_active,
            },
        );
    }
}

#[async_trait]
impl PriceOracle for FixedPrices {
    async fn price_of(&self, product_id: i32) -> Result<Option<PriceQuote>, CartError> {
        Ok(self.prices.lock().await.get(&product_id).copied())
    }
}

/// Promotion oracle over a fixed lookup table
#[derive(Default)]
pub struct FixedPromos {
    promos: Mutex<HashMap<String, PromoLookup>>,
}

impl FixedPromos {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_valid(&self, code: &str, rule: DiscountRule) {
        self.promos
            .lock()
            .await
            .insert(code.to_string(), PromoLookup::Valid(rule));
    }

    pub async fn set_expired(&self, code: &str) {
        self.promos
            .lock()
            .await
            .insert(code.to_string(), PromoLookup::Expired);
    }
}

#[async_trait]
impl PromotionOracle for FixedPromos {
    async fn resolve(&self, code: &str) -> Result<PromoLookup, CartError> {
        Ok(self
            .promos
            .lock()
            .await
            .get(code)
            .cloned()
            .unwrap_or(PromoLookup::NotFound))
    }
}

/// A cart service wired to fresh in-memory collaborators
pub fn service_with_fakes() -> (
    crate::cart::service::CartService,
    Arc<InMemoryCartStore>,
    Arc<FixedPrices>,
    Arc<FixedPromos>,
) {
    let store = Arc::new(InMemoryCartStore::new());
    let prices = Arc::new(FixedPrices::new());
    let promos = Arc::new(FixedPromos::new());
    let service = crate::cart::service::CartService::new(
        store.clone(),
        prices.clone(),
        promos.clone(),
    );
    (service, store, prices, promos)
}
