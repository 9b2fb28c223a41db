//! Cart pricing computation.
//!
//! Pure functions: the same cart and eligibility flag always produce the
//! same snapshot, so pricing can be tested without any UI or session state.
//! Snapshots are recomputed on every read and never cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercadito_core::Money;

use crate::cart::Cart;

/// Pricing rules applied at checkout.
///
/// Defaults match the store policy: 5% client discount, free shipping from
/// $25.000 CLP, flat $3.000 CLP shipping below that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Discount rate applied when the current user is a registered client.
    pub discount_rate: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Money,
    /// Shipping cost charged below the threshold.
    pub flat_shipping_cost: Money,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            discount_rate: Decimal::new(5, 2),
            free_shipping_threshold: Money::new(25_000),
            flat_shipping_cost: Money::new(3_000),
        }
    }
}

impl PricingRules {
    /// How much more the cart needs before shipping becomes free.
    ///
    /// Returns `None` once the threshold is reached. Used for the
    /// "add $X more for free shipping" hint.
    #[must_use]
    pub fn remaining_for_free_shipping(&self, subtotal: Money) -> Option<Money> {
        if subtotal >= self.free_shipping_threshold {
            None
        } else {
            Some(self.free_shipping_threshold.saturating_sub(subtotal))
        }
    }
}

/// Derived totals for a cart at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub total: Money,
}

/// Compute the pricing snapshot for a cart.
///
/// - subtotal: sum of unit price times quantity over all lines
/// - discount: `discount_rate` of the subtotal when eligible, rounded to
///   whole pesos; zero otherwise
/// - shipping: free at or above the threshold, flat cost below it
/// - total: subtotal minus discount plus shipping
#[must_use]
pub fn compute_pricing(cart: &Cart, eligible_for_discount: bool, rules: &PricingRules) -> PricingSnapshot {
    let subtotal = cart.subtotal();
    let discount = if eligible_for_discount {
        subtotal.fraction(rules.discount_rate)
    } else {
        Money::ZERO
    };
    let shipping = if subtotal >= rules.free_shipping_threshold {
        Money::ZERO
    } else {
        rules.flat_shipping_cost
    };
    let total = subtotal.saturating_sub(discount) + shipping;

    PricingSnapshot {
        subtotal,
        discount,
        shipping,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use mercadito_core::ProductId;

    fn cart_with_subtotal(pesos: i64) -> Cart {
        let mut cart = Cart::default();
        cart.add_item(
            &Product {
                id: ProductId::new(1),
                name: "Mermelada casera".to_string(),
                price: Money::new(pesos),
                image: None,
                description: None,
            },
            1,
        );
        cart
    }

    #[test]
    fn test_empty_cart_prices_to_shipping_only() {
        let snapshot = compute_pricing(&Cart::default(), false, &PricingRules::default());
        assert_eq!(snapshot.subtotal, Money::ZERO);
        assert_eq!(snapshot.discount, Money::ZERO);
        assert_eq!(snapshot.shipping, Money::new(3_000));
        assert_eq!(snapshot.total, Money::new(3_000));
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let cart = cart_with_subtotal(17_990);
        let rules = PricingRules::default();

        let first = compute_pricing(&cart, true, &rules);
        let second = compute_pricing(&cart, true, &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shipping_below_threshold() {
        let snapshot = compute_pricing(&cart_with_subtotal(20_000), false, &PricingRules::default());
        assert_eq!(snapshot.shipping, Money::new(3_000));
        assert_eq!(snapshot.total, Money::new(23_000));
    }

    #[test]
    fn test_shipping_free_at_threshold() {
        let rules = PricingRules::default();
        let at = compute_pricing(&cart_with_subtotal(25_000), false, &rules);
        assert_eq!(at.shipping, Money::ZERO);

        let above = compute_pricing(&cart_with_subtotal(30_000), false, &rules);
        assert_eq!(above.shipping, Money::ZERO);
        assert_eq!(above.total, Money::new(30_000));
    }

    #[test]
    fn test_discount_applies_only_when_eligible() {
        let cart = cart_with_subtotal(10_000);
        let rules = PricingRules::default();

        let eligible = compute_pricing(&cart, true, &rules);
        assert_eq!(eligible.discount, Money::new(500));
        assert_eq!(eligible.total, Money::new(12_500));

        let ineligible = compute_pricing(&cart, false, &rules);
        assert_eq!(ineligible.discount, Money::ZERO);
        assert_eq!(ineligible.total, Money::new(13_000));
    }

    #[test]
    fn test_discount_rounds_to_whole_pesos() {
        // 5% of 11_990 is 599.5 -> rounds to 600
        let snapshot = compute_pricing(&cart_with_subtotal(11_990), true, &PricingRules::default());
        assert_eq!(snapshot.discount, Money::new(600));
    }

    #[test]
    fn test_remaining_for_free_shipping() {
        let rules = PricingRules::default();
        assert_eq!(
            rules.remaining_for_free_shipping(Money::new(20_000)),
            Some(Money::new(5_000))
        );
        assert_eq!(rules.remaining_for_free_shipping(Money::new(25_000)), None);
        assert_eq!(rules.remaining_for_free_shipping(Money::new(30_000)), None);
    }
}
