use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Cart status enum representing the lifecycle of a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Ordered,
    Abandoned,
}

impl CartStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Ordered => "ordered",
            CartStatus::Abandoned => "abandoned",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CartStatus::Active),
            "ordered" => Ok(CartStatus::Ordered),
            "abandoned" => Ok(CartStatus::Abandoned),
            _ => Err(format!("Invalid cart status: {}", s)),
        }
    }
}

impl Default for CartStatus {
    fn default() -> Self {
        CartStatus::Active
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of discount a promotion grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Percentage of the cart subtotal (value is a percent, 10 = 10%)
    Percentage,
    /// Fixed amount off the subtotal
    Fixed,
}

/// A promotion's discount rule as resolved from the promotion catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountRule {
    pub kind: DiscountKind,
    pub value: Decimal,
}

/// Domain model representing a cart row in the database
///
/// `subtotal`, `discount` and `total` are derived fields, only ever written
/// by the pricing recomputation. `promo_kind`/`promo_value` are the applied
/// promotion's rule, snapshotted at apply time so recomputation never
/// re-reads the promotion catalog.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: i32,
    pub status: CartStatus,
    #[schema(value_type = f64, example = 20.00)]
    pub subtotal: Decimal,
    #[schema(value_type = f64, example = 2.00)]
    pub discount: Decimal,
    #[schema(value_type = f64, example = 18.00)]
    pub total: Decimal,
    pub applied_promo_code: Option<String>,
    pub promo_kind: Option<DiscountKind>,
    #[schema(value_type = Option<f64>)]
    pub promo_value: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// The applied promotion's rule snapshot, if a code is applied
    pub fn applied_rule(&self) -> Option<DiscountRule> {
        match (self.applied_promo_code.as_ref(), self.promo_kind, self.promo_value) {
            (Some(_), Some(kind), Some(value)) => Some(DiscountRule { kind, value }),
            _ => None,
        }
    }
}

/// Domain model representing a line item within a cart
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartLineItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price_snapshot: Decimal,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A cart together with its eagerly loaded line items
///
/// Every mutation needs the full item set to recompute pricing, so the store
/// always returns the two together.
#[derive(Debug, Clone)]
pub struct CartWithItems {
    pub cart: Cart,
    pub items: Vec<CartLineItem>,
}

/// Request DTO for adding a product to the cart
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    #[schema(example = 1)]
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 2, minimum = 1)]
    pub quantity: i32,
}

/// Request DTO for changing a line item's quantity
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 3, minimum = 1)]
    pub quantity: i32,
}

/// Request DTO for applying a promo code
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ApplyPromoRequest {
    #[validate(length(min = 1, message = "Promo code must not be empty"))]
    #[schema(example = "SAVE10")]
    pub code: String,
}

/// Response DTO for a cart with its items
#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: i32,
    pub status: CartStatus,
    #[schema(value_type = f64, example = 20.00)]
    pub subtotal: Decimal,
    #[schema(value_type = f64, example = 2.00)]
    pub discount: Decimal,
    #[schema(value_type = f64, example = 18.00)]
    pub total: Decimal,
    #[schema(example = "SAVE10")]
    pub applied_promo_code: Option<String>,
    pub items: Vec<CartItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for a cart line item
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    #[schema(example = 1)]
    pub product_id: i32,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(value_type = f64, example = 10.00)]
    pub unit_price_snapshot: Decimal,
    #[schema(value_type = f64, example = 20.00)]
    pub line_total: Decimal,
}

impl From<CartLineItem> for CartItemResponse {
    fn from(item: CartLineItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_snapshot: item.unit_price_snapshot,
            line_total: item.line_total,
        }
    }
}

impl CartResponse {
    /// Build the response projection from a cart and its items
    pub fn from_parts(cart: Cart, items: Vec<CartLineItem>) -> Self {
        Self {
            id: cart.id,
            user_id: cart.user_id,
            status: cart.status,
            subtotal: cart.subtotal,
            discount: cart.discount,
            total: cart.total,
            applied_promo_code: cart.applied_promo_code,
            items: items.into_iter().map(|item| item.into()).collect(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }
}
