use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::cart::error::CartError;
use crate::cart::locks::UserLocks;
use crate::cart::models::{Cart, CartLineItem, CartResponse, CartWithItems};
use crate::cart::oracle::{PriceOracle, PromoLookup, PromotionOracle};
use crate::cart::pricing::PricingEngine;
use crate::cart::store::CartStore;

/// Service orchestrating all cart mutations
///
/// Every operation takes an explicit user id, runs under that user's lock,
/// and performs a full read-modify-recompute-write sequence against the
/// store. A storage-level conflict (lost race detected by a unique
/// constraint) is retried exactly once from a fresh read.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    prices: Arc<dyn PriceOracle>,
    promos: Arc<dyn PromotionOracle>,
    locks: UserLocks,
}

impl CartService {
    /// Create a new CartService over a store and the two catalog oracles
    pub fn new(
        store: Arc<dyn CartStore>,
        prices: Arc<dyn PriceOracle>,
        promos: Arc<dyn PromotionOracle>,
    ) -> Self {
        Self {
            store,
            prices,
            promos,
            locks: UserLocks::new(),
        }
    }

    /// Get the user's current Active cart, creating an empty one if none exists
    ///
    /// Idempotent: repeated calls return the same cart and never create a
    /// second Active cart for the user.
    pub async fn get_current_cart(&self, user_id: i32) -> Result<CartResponse, CartError> {
        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        let CartWithItems { cart, items } = self.resolve_cart(user_id).await?;
        Ok(CartResponse::from_parts(cart, items))
    }

    /// Add a quantity of a product to the user's current cart
    ///
    /// If the product is already in the cart its quantity is incremented and
    /// its unit price snapshot refreshed to the catalog's current price;
    /// otherwise a new line item is created.
    pub async fn add_item(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<CartResponse, CartError> {
        validate_quantity(quantity)?;

        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.add_item_locked(user_id, product_id, quantity).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying add_item for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.add_item_locked(user_id, product_id, quantity).await
            }
            other => other,
        }
    }

    /// Change the quantity of a line item in the user's current cart
    ///
    /// The item must belong to the caller's cart; ids from another user's
    /// cart fail with the same `ItemNotFound` as absent ids. The existing
    /// price snapshot is kept.
    pub async fn update_item(
        &self,
        user_id: i32,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartResponse, CartError> {
        validate_quantity(quantity)?;

        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.update_item_locked(user_id, item_id, quantity).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying update_item for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.update_item_locked(user_id, item_id, quantity).await
            }
            other => other,
        }
    }

    /// Remove a line item from the user's current cart
    pub async fn remove_item(&self, user_id: i32, item_id: Uuid) -> Result<CartResponse, CartError> {
        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.remove_item_locked(user_id, item_id).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying remove_item for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.remove_item_locked(user_id, item_id).await
            }
            other => other,
        }
    }

    /// Apply a promo code to the user's current cart
    ///
    /// A previously applied code is silently replaced; promotions do not
    /// stack. The code's rule is snapshotted onto the cart.
    pub async fn apply_promo(&self, user_id: i32, code: &str) -> Result<CartResponse, CartError> {
        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.apply_promo_locked(user_id, code).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying apply_promo for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.apply_promo_locked(user_id, code).await
            }
            other => other,
        }
    }

    /// Remove any applied promo code from the user's current cart
    ///
    /// Idempotent: succeeds even if no promo was applied.
    pub async fn remove_promo(&self, user_id: i32) -> Result<CartResponse, CartError> {
        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.remove_promo_locked(user_id).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying remove_promo for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.remove_promo_locked(user_id).await
            }
            other => other,
        }
    }

    /// Remove all line items and any applied promo from the user's current cart
    ///
    /// The cart remains Active with all-zero pricing.
    pub async fn clear_cart(&self, user_id: i32) -> Result<CartResponse, CartError> {
        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        match self.clear_cart_locked(user_id).await {
            Err(CartError::Conflict(msg)) => {
                tracing::warn!(
                    "Retrying clear_cart for user {} after storage conflict: {}",
                    user_id,
                    msg
                );
                self.clear_cart_locked(user_id).await
            }
            other => other,
        }
    }

    /// Load the user's Active cart, creating one if none exists
    ///
    /// If the create loses a race (conflict from the unique constraint), the
    /// winner's cart is reloaded instead.
    async fn resolve_cart(&self, user_id: i32) -> Result<CartWithItems, CartError> {
        if let Some(existing) = self.store.load_active(user_id).await? {
            return Ok(existing);
        }

        match self.store.create_active(user_id).await {
            Ok(created) => Ok(created),
            Err(CartError::Conflict(msg)) => {
                tracing::debug!(
                    "Lost cart creation race for user {}, reloading: {}",
                    user_id,
                    msg
                );
                self.store.load_active(user_id).await?.ok_or_else(|| {
                    CartError::DatabaseError(format!(
                        "Active cart for user {} vanished after create conflict",
                        user_id
                    ))
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn add_item_locked(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<CartResponse, CartError> {
        let CartWithItems { cart, mut items } = self.resolve_cart(user_id).await?;

        let quote = self
            .prices
            .price_of(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;
        if !quote.is_active {
            return Err(CartError::ProductInactive(product_id));
        }

        // At most one line item per product: re-adding increments the
        // existing line and refreshes its price snapshot.
        if let Some(item) = items.iter_mut().find(|item| item.product_id == product_id) {
            item.quantity = item.quantity.checked_add(quantity).ok_or_else(|| {
                CartError::InvalidQuantity(
                    "Combined quantity exceeds the supported range".to_string(),
                )
            })?;
            item.unit_price_snapshot = quote.unit_price;
            item.line_total = PricingEngine::line_total(item.quantity, quote.unit_price);
        } else {
            items.push(CartLineItem {
                id: Uuid::new_v4(),
                cart_id: cart.id,
                product_id,
                quantity,
                unit_price_snapshot: quote.unit_price,
                line_total: PricingEngine::line_total(quantity, quote.unit_price),
                created_at: Utc::now(),
            });
        }

        self.recompute_and_save(cart, items).await
    }

    async fn update_item_locked(
        &self,
        user_id: i32,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartResponse, CartError> {
        let CartWithItems { cart, mut items } = self.resolve_cart(user_id).await?;

        // Searching the caller's own cart is the ownership check: an id from
        // another user's cart is indistinguishable from an absent one.
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(CartError::ItemNotFound)?;

        item.quantity = quantity;
        item.line_total = PricingEngine::line_total(quantity, item.unit_price_snapshot);

        self.recompute_and_save(cart, items).await
    }

    async fn remove_item_locked(
        &self,
        user_id: i32,
        item_id: Uuid,
    ) -> Result<CartResponse, CartError> {
        let CartWithItems { cart, mut items } = self.resolve_cart(user_id).await?;

        let position = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(CartError::ItemNotFound)?;
        items.remove(position);

        self.recompute_and_save(cart, items).await
    }

    async fn apply_promo_locked(&self, user_id: i32, code: &str) -> Result<CartResponse, CartError> {
        let CartWithItems { mut cart, items } = self.resolve_cart(user_id).await?;

        let rule = match self.promos.resolve(code).await? {
            PromoLookup::Valid(rule) => rule,
            PromoLookup::Expired => return Err(CartError::PromoExpired(code.to_string())),
            PromoLookup::NotFound => return Err(CartError::PromoNotFound(code.to_string())),
        };

        if let Some(previous) = cart.applied_promo_code.as_deref() {
            if previous != code {
                tracing::debug!(
                    "Replacing promo code '{}' with '{}' on cart {}",
                    previous,
                    code,
                    cart.id
                );
            }
        }

        cart.applied_promo_code = Some(code.to_string());
        cart.promo_kind = Some(rule.kind);
        cart.promo_value = Some(rule.value);

        self.recompute_and_save(cart, items).await
    }

    async fn remove_promo_locked(&self, user_id: i32) -> Result<CartResponse, CartError> {
        let CartWithItems { mut cart, items } = self.resolve_cart(user_id).await?;

        cart.applied_promo_code = None;
        cart.promo_kind = None;
        cart.promo_value = None;

        self.recompute_and_save(cart, items).await
    }

    async fn clear_cart_locked(&self, user_id: i32) -> Result<CartResponse, CartError> {
        let CartWithItems { mut cart, mut items } = self.resolve_cart(user_id).await?;

        items.clear();
        cart.applied_promo_code = None;
        cart.promo_kind = None;
        cart.promo_value = None;

        self.recompute_and_save(cart, items).await
    }

    /// Recompute derived pricing, bump updated_at, persist atomically
    async fn recompute_and_save(
        &self,
        mut cart: Cart,
        items: Vec<CartLineItem>,
    ) -> Result<CartResponse, CartError> {
        let breakdown = PricingEngine::compute(&items, cart.applied_rule());
        cart.subtotal = breakdown.subtotal;
        cart.discount = breakdown.discount;
        cart.total = breakdown.total;
        cart.updated_at = Utc::now();

        self.store.save(&cart, &items).await?;

        Ok(CartResponse::from_parts(cart, items))
    }
}

fn validate_quantity(quantity: i32) -> Result<(), CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(format!(
            "Quantity must be positive, got {}",
            quantity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::models::{DiscountKind, DiscountRule};
    use crate::cart::testing::service_with_fakes;
    use rust_decimal_macros::dec;

    const USER: i32 = 7;

    #[tokio::test]
    async fn test_get_current_cart_is_idempotent() {
        let (service, store, _, _) = service_with_fakes();

        let first = service.get_current_cart(USER).await.unwrap();
        let second = service.get_current_cart(USER).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.cart_count().await, 1);
        assert_eq!(first.subtotal, dec!(0));
        assert_eq!(first.total, dec!(0));
        assert!(first.items.is_empty());
        assert!(first.applied_promo_code.is_none());
    }

    #[tokio::test]
    async fn test_add_item_creates_line_item() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        let cart = service.add_item(USER, 1, 2).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[0].unit_price_snapshot, dec!(10.00));
        assert_eq!(cart.items[0].line_total, dec!(20.00));
        assert_eq!(cart.subtotal, dec!(20.00));
        assert_eq!(cart.discount, dec!(0));
        assert_eq!(cart.total, dec!(20.00));
    }

    #[tokio::test]
    async fn test_add_is_additive_with_latest_price() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        service.add_item(USER, 1, 2).await.unwrap();

        // Catalog price changes between adds; the snapshot follows it.
        prices.set(1, dec!(12.00), true).await;
        let cart = service.add_item(USER, 1, 3).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].unit_price_snapshot, dec!(12.00));
        assert_eq!(cart.items[0].line_total, dec!(60.00));
        assert_eq!(cart.subtotal, dec!(60.00));
    }

    #[tokio::test]
    async fn test_additive_add_rejects_quantity_overflow() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(1.00), true).await;

        service.add_item(USER, 1, i32::MAX).await.unwrap();
        let err = service.add_item(USER, 1, 1).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(_)));

        // The failed add leaves the existing line untouched
        let cart = service.get_current_cart(USER).await.unwrap();
        assert_eq!(cart.items[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn test_add_item_rejects_non_positive_quantity() {
        let (service, store, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        for quantity in [0, -3] {
            let err = service.add_item(USER, 1, quantity).await.unwrap_err();
            assert!(matches!(err, CartError::InvalidQuantity(_)));
        }
        // Validation fails before any cart is resolved
        assert_eq!(store.cart_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_item_unknown_product() {
        let (service, _, _, _) = service_with_fakes();
        let err = service.add_item(USER, 99, 1).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(99)));
    }

    #[tokio::test]
    async fn test_add_item_inactive_product() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(5, dec!(4.00), false).await;

        let err = service.add_item(USER, 5, 1).await.unwrap_err();
        assert!(matches!(err, CartError::ProductInactive(5)));

        // Failed add leaves the cart unchanged
        let cart = service.get_current_cart(USER).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.subtotal, dec!(0));
    }

    #[tokio::test]
    async fn test_update_item_quantity() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        let cart = service.add_item(USER, 1, 2).await.unwrap();
        let item_id = cart.items[0].id;

        // Price changes after the add; update keeps the existing snapshot.
        prices.set(1, dec!(99.00), true).await;
        let updated = service.update_item(USER, item_id, 4).await.unwrap();

        assert_eq!(updated.items[0].quantity, 4);
        assert_eq!(updated.items[0].unit_price_snapshot, dec!(10.00));
        assert_eq!(updated.items[0].line_total, dec!(40.00));
        assert_eq!(updated.subtotal, dec!(40.00));
        assert_eq!(updated.total, dec!(40.00));
    }

    #[tokio::test]
    async fn test_update_item_rejects_non_positive_quantity() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        let cart = service.add_item(USER, 1, 2).await.unwrap();
        let item_id = cart.items[0].id;

        let err = service.update_item(USER, item_id, 0).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_item() {
        let (service, _, _, _) = service_with_fakes();
        let err = service.update_item(USER, Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[tokio::test]
    async fn test_cross_user_item_access_is_not_found() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        let owner_cart = service.add_item(USER, 1, 2).await.unwrap();
        let item_id = owner_cart.items[0].id;

        let other_user = USER + 1;
        let update_err = service.update_item(other_user, item_id, 5).await.unwrap_err();
        assert!(matches!(update_err, CartError::ItemNotFound));
        let remove_err = service.remove_item(other_user, item_id).await.unwrap_err();
        assert!(matches!(remove_err, CartError::ItemNotFound));

        // The owner's item is untouched
        let owner_cart = service.get_current_cart(USER).await.unwrap();
        assert_eq!(owner_cart.items.len(), 1);
        assert_eq!(owner_cart.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_remove_item() {
        let (service, _, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        prices.set(2, dec!(3.50), true).await;

        let cart = service.add_item(USER, 1, 2).await.unwrap();
        let first_item = cart.items[0].id;
        service.add_item(USER, 2, 1).await.unwrap();

        let after = service.remove_item(USER, first_item).await.unwrap();
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].product_id, 2);
        assert_eq!(after.subtotal, dec!(3.50));
        assert_eq!(after.total, dec!(3.50));
    }

    #[tokio::test]
    async fn test_apply_promo_percentage() {
        let (service, _, prices, promos) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        promos
            .set_valid(
                "SAVE10",
                DiscountRule {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                },
            )
            .await;

        service.add_item(USER, 1, 2).await.unwrap();
        let cart = service.apply_promo(USER, "SAVE10").await.unwrap();

        assert_eq!(cart.applied_promo_code.as_deref(), Some("SAVE10"));
        assert_eq!(cart.subtotal, dec!(20.00));
        assert_eq!(cart.discount, dec!(2.00));
        assert_eq!(cart.total, dec!(18.00));
    }

    #[tokio::test]
    async fn test_promo_replaces_rather_than_stacks() {
        let (service, _, prices, promos) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        promos
            .set_valid(
                "SAVE10",
                DiscountRule {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                },
            )
            .await;
        promos
            .set_valid(
                "FLAT5",
                DiscountRule {
                    kind: DiscountKind::Fixed,
                    value: dec!(5.00),
                },
            )
            .await;

        service.add_item(USER, 1, 2).await.unwrap();
        service.apply_promo(USER, "SAVE10").await.unwrap();
        let cart = service.apply_promo(USER, "FLAT5").await.unwrap();

        // Only FLAT5's rule is in effect
        assert_eq!(cart.applied_promo_code.as_deref(), Some("FLAT5"));
        assert_eq!(cart.discount, dec!(5.00));
        assert_eq!(cart.total, dec!(15.00));
    }

    #[tokio::test]
    async fn test_apply_unknown_promo() {
        let (service, _, _, _) = service_with_fakes();
        let err = service.apply_promo(USER, "NOPE").await.unwrap_err();
        assert!(matches!(err, CartError::PromoNotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_expired_promo() {
        let (service, _, _, promos) = service_with_fakes();
        promos.set_expired("OLD").await;

        let err = service.apply_promo(USER, "OLD").await.unwrap_err();
        assert!(matches!(err, CartError::PromoExpired(_)));
    }

    #[tokio::test]
    async fn test_remove_promo_is_idempotent() {
        let (service, _, prices, promos) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        promos
            .set_valid(
                "SAVE10",
                DiscountRule {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                },
            )
            .await;

        service.add_item(USER, 1, 2).await.unwrap();
        service.apply_promo(USER, "SAVE10").await.unwrap();

        let cart = service.remove_promo(USER).await.unwrap();
        assert!(cart.applied_promo_code.is_none());
        assert_eq!(cart.discount, dec!(0));
        assert_eq!(cart.total, dec!(20.00));

        // No promo applied: still succeeds
        let again = service.remove_promo(USER).await.unwrap();
        assert!(again.applied_promo_code.is_none());
        assert_eq!(again.total, dec!(20.00));
    }

    #[tokio::test]
    async fn test_clear_cart_resets_fully() {
        let (service, _, prices, promos) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        prices.set(2, dec!(5.00), true).await;
        promos
            .set_valid(
                "SAVE10",
                DiscountRule {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                },
            )
            .await;

        service.add_item(USER, 1, 2).await.unwrap();
        service.add_item(USER, 2, 1).await.unwrap();
        service.apply_promo(USER, "SAVE10").await.unwrap();

        let cleared = service.clear_cart(USER).await.unwrap();
        assert!(cleared.items.is_empty());
        assert!(cleared.applied_promo_code.is_none());
        assert_eq!(cleared.subtotal, dec!(0));
        assert_eq!(cleared.discount, dec!(0));
        assert_eq!(cleared.total, dec!(0));
        assert_eq!(cleared.status, crate::cart::models::CartStatus::Active);
    }

    /// The end-to-end pricing walk: add, promo, add again, remove
    #[tokio::test]
    async fn test_pricing_scenario_walkthrough() {
        let (service, _, prices, promos) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;
        promos
            .set_valid(
                "SAVE10",
                DiscountRule {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                },
            )
            .await;

        let cart = service.add_item(USER, 1, 2).await.unwrap();
        assert_eq!(cart.subtotal, dec!(20.00));
        assert_eq!(cart.total, dec!(20.00));

        let cart = service.apply_promo(USER, "SAVE10").await.unwrap();
        assert_eq!(cart.discount, dec!(2.00));
        assert_eq!(cart.total, dec!(18.00));

        let cart = service.add_item(USER, 1, 1).await.unwrap();
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].line_total, dec!(30.00));
        assert_eq!(cart.subtotal, dec!(30.00));
        assert_eq!(cart.discount, dec!(3.00));
        assert_eq!(cart.total, dec!(27.00));

        let item_id = cart.items[0].id;
        let cart = service.remove_item(USER, item_id).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.subtotal, dec!(0));
        assert_eq!(cart.discount, dec!(0));
        assert_eq!(cart.total, dec!(0));
        // The promo stays recorded, inert until items come back
        assert_eq!(cart.applied_promo_code.as_deref(), Some("SAVE10"));

        let cart = service.add_item(USER, 1, 1).await.unwrap();
        assert_eq!(cart.discount, dec!(1.00));
        assert_eq!(cart.total, dec!(9.00));
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_product_merge() {
        let (service, store, prices, _) = service_with_fakes();
        prices.set(1, dec!(10.00), true).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.add_item(USER, 1, 1).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cart = service.get_current_cart(USER).await.unwrap();
        assert_eq!(store.cart_count().await, 1);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 8);
        assert_eq!(cart.subtotal, dec!(80.00));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_cart() {
        let (service, store, _, _) = service_with_fakes();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.get_current_cart(USER).await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        assert_eq!(store.cart_count().await, 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }
}
