use rust_decimal::Decimal;

use crate::cart::models::{CartLineItem, DiscountKind, DiscountRule};

/// Derived monetary fields of a cart after recomputation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Pure pricing recomputation for a cart
///
/// Invoked after every structural change to a cart's line items or promo
/// state. No side effects, fully deterministic.
pub struct PricingEngine;

impl PricingEngine {
    /// Calculate a line item's total from its quantity and price snapshot
    pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Recompute subtotal, discount and total for a set of line items
    ///
    /// The discount is clamped into `[0, subtotal]` so it survives the cart
    /// shrinking below the promotion's original basis: a fixed 5.00 rule on
    /// a 3.00 cart discounts 3.00, and any rule on an empty cart discounts
    /// nothing.
    pub fn compute(items: &[CartLineItem], rule: Option<DiscountRule>) -> PricingBreakdown {
        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();

        let discount = match rule {
            Some(rule) => {
                let raw = match rule.kind {
                    DiscountKind::Percentage => {
                        (subtotal * rule.value / Decimal::ONE_HUNDRED).round_dp(2)
                    }
                    DiscountKind::Fixed => rule.value,
                };
                raw.clamp(Decimal::ZERO, subtotal)
            }
            None => Decimal::ZERO,
        };

        PricingBreakdown {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }
}
