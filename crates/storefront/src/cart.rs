//! In-memory shopping cart.
//!
//! The cart is a pure data structure: mutations never do I/O. Persistence
//! across requests is handled by the session helpers in `routes::cart`,
//! which serialize the whole cart into the session.
//!
//! Core invariant: no line ever has quantity 0. A quantity update that
//! reaches zero removes the line instead.

use serde::{Deserialize, Serialize};

use mercadito_core::{Money, ProductId};

use crate::catalog::Product;

/// One product entry in the cart with an associated quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Always >= 1.
    pub quantity: u32,
    pub image: Option<String>,
}

impl CartLine {
    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Shopping cart: an ordered collection of lines with unique product IDs.
///
/// Lines keep their insertion order; adding an already-present product
/// increments its quantity in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add a product to the cart.
    ///
    /// If the product is already present its quantity is incremented,
    /// otherwise a new line is appended. A zero quantity is a no-op.
    pub fn add_item(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            // Saturate rather than wrap: a wrapped sum could land on 0 and
            // break the no-zero-quantity invariant
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
                image: product.image.clone(),
            });
        }
    }

    /// Replace the quantity of a line.
    ///
    /// A quantity of zero removes the line. Updating a product that is not
    /// in the cart is a no-op.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
        }
    }

    /// Remove a line from the cart. Idempotent.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Empty the cart. Called after a confirmed order, or when the user
    /// explicitly empties it.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Producto {id}"),
            price: Money::new(price),
            image: None,
            description: None,
        }
    }

    fn assert_no_zero_quantities(cart: &Cart) {
        assert!(
            cart.lines().iter().all(|line| line.quantity >= 1),
            "cart contains a line with quantity 0: {cart:?}"
        );
    }

    #[test]
    fn test_add_item_appends_new_line() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 1500), 2);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_item_count(), 2);
        assert_eq!(cart.subtotal(), Money::new(3000));
    }

    #[test]
    fn test_add_item_merges_existing_product() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 1500), 2);
        cart.add_item(&product(1, 1500), 3);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total_item_count(), 5);
    }

    #[test]
    fn test_add_item_zero_quantity_is_noop() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 1500), 0);

        assert!(cart.is_empty());
        assert_no_zero_quantities(&cart);
    }

    #[test]
    fn test_add_item_saturates_instead_of_wrapping() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 1500), u32::MAX);
        cart.add_item(&product(1, 1500), 1);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, u32::MAX);
        assert_no_zero_quantities(&cart);
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = Cart::default();
        cart.add_item(&product(3, 100), 1);
        cart.add_item(&product(1, 100), 1);
        cart.add_item(&product(2, 100), 1);

        let ids: Vec<i32> = cart.lines().iter().map(|l| l.product_id.as_i32()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_update_quantity_replaces_in_place() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 990), 2);
        cart.update_quantity(ProductId::new(1), 7);

        assert_eq!(cart.total_item_count(), 7);
        assert_eq!(cart.subtotal(), Money::new(6930));
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 990), 2);
        cart.add_item(&product(2, 500), 1);
        cart.update_quantity(ProductId::new(1), 0);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_id, ProductId::new(2));
        assert_no_zero_quantities(&cart);
    }

    #[test]
    fn test_update_quantity_missing_product_is_noop() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 990), 2);
        let before = cart.clone();

        cart.update_quantity(ProductId::new(99), 5);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 990), 2);

        cart.remove_item(ProductId::new(1));
        assert!(cart.is_empty());

        cart.remove_item(ProductId::new(1));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_empties_cart() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 990), 2);
        cart.add_item(&product(2, 500), 4);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_item_count(), 0);
        assert_eq!(cart.subtotal(), Money::ZERO);
    }

    #[test]
    fn test_mutation_sequences_never_leave_zero_quantities() {
        // A mixed sequence of operations exercising every mutation path.
        let mut cart = Cart::default();
        let steps: Vec<Box<dyn Fn(&mut Cart)>> = vec![
            Box::new(|c| c.add_item(&product(1, 100), 1)),
            Box::new(|c| c.add_item(&product(2, 200), 3)),
            Box::new(|c| c.update_quantity(ProductId::new(1), 0)),
            Box::new(|c| c.add_item(&product(1, 100), 2)),
            Box::new(|c| c.update_quantity(ProductId::new(2), 1)),
            Box::new(|c| c.remove_item(ProductId::new(3))),
            Box::new(|c| c.update_quantity(ProductId::new(2), 0)),
            Box::new(|c| c.add_item(&product(3, 300), 0)),
        ];

        for step in steps {
            step(&mut cart);
            assert_no_zero_quantities(&cart);
        }

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_id, ProductId::new(1));
        assert_eq!(cart.lines()[0].quantity, 2);
    }
}
