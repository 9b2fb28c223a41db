//! Cart route handlers.
//!
//! The cart is serialized into the session: every mutating handler takes
//! the session's cart lock, loads the cart, applies one mutation, saves it
//! back, and returns the refreshed view with a fresh pricing snapshot
//! (pricing is recomputed on every read, never cached). The lock keeps two
//! concurrent requests in one session from losing each other's update.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use mercadito_core::{Money, ProductId};

use crate::cart::{Cart, CartLine};
use crate::error::Result;
use crate::models::{CurrentUser, session_keys};
use crate::pricing::{PricingRules, PricingSnapshot, compute_pricing};
use crate::state::AppState;

// =============================================================================
// View types
// =============================================================================

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    pub image: Option<String>,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
            image: line.image.clone(),
        }
    }
}

/// Cart display data: lines plus the derived pricing snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub pricing: PricingSnapshot,
    /// Whether the client discount was applied to the snapshot.
    pub discount_applied: bool,
    /// How much more to add before shipping is free, when not yet free.
    pub remaining_for_free_shipping: Option<Money>,
}

impl CartView {
    pub(crate) fn build(cart: &Cart, eligible: bool, rules: &PricingRules) -> Self {
        let pricing = compute_pricing(cart, eligible, rules);
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            item_count: cart.total_item_count(),
            pricing,
            discount_applied: eligible && !pricing.discount.is_zero(),
            remaining_for_free_shipping: rules.remaining_for_free_shipping(pricing.subtotal),
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Serialize)]
pub struct CartCountView {
    pub count: u32,
}

// =============================================================================
// Session helpers
// =============================================================================

/// Load the cart from the session, empty if absent.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Save the cart back to the session.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Get the current user from the session, if the auth layer stored one.
pub(crate) async fn current_user(session: &Session) -> Result<Option<CurrentUser>> {
    Ok(session.get::<CurrentUser>(session_keys::CURRENT_USER).await?)
}

/// The discount-eligibility flag for this session.
pub(crate) async fn is_eligible_for_discount(session: &Session) -> Result<bool> {
    Ok(current_user(session).await?.is_some_and(|user| user.is_client))
}

// =============================================================================
// Request types
// =============================================================================

/// Add to cart request body.
///
/// An omitted quantity defaults to 1; an explicit 0 is a no-op, matching
/// the store's add semantics.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart request body. Zero or negative quantities remove the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart with its pricing snapshot.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    let eligible = is_eligible_for_discount(&session).await?;
    Ok(Json(CartView::build(&cart, eligible, &state.config().pricing)))
}

/// Add a product to the cart.
///
/// The product is looked up in the catalog so the cart line carries the
/// authoritative name and price. Missing products are a 404.
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let quantity = body.quantity.unwrap_or(1);
    let product = state.catalog().get_product(body.product_id).await?;

    let gate = state.session_gate(session.id());
    let _cart_lock = gate.lock_cart().await;
    let mut cart = load_cart(&session).await?;
    cart.add_item(&product, quantity);
    save_cart(&session, &cart).await?;

    let eligible = is_eligible_for_discount(&session).await?;
    Ok(Json(CartView::build(&cart, eligible, &state.config().pricing)))
}

/// Replace a line's quantity. Zero or negative removes the line.
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let quantity = u32::try_from(body.quantity).unwrap_or(0);

    let gate = state.session_gate(session.id());
    let _cart_lock = gate.lock_cart().await;
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(body.product_id, quantity);
    save_cart(&session, &cart).await?;

    let eligible = is_eligible_for_discount(&session).await?;
    Ok(Json(CartView::build(&cart, eligible, &state.config().pricing)))
}

/// Remove a line from the cart.
#[instrument(skip(state, session), fields(product_id = %body.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let gate = state.session_gate(session.id());
    let _cart_lock = gate.lock_cart().await;
    let mut cart = load_cart(&session).await?;
    cart.remove_item(body.product_id);
    save_cart(&session, &cart).await?;

    let eligible = is_eligible_for_discount(&session).await?;
    Ok(Json(CartView::build(&cart, eligible, &state.config().pricing)))
}

/// Empty the cart on explicit user request.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let gate = state.session_gate(session.id());
    let _cart_lock = gate.lock_cart().await;
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await?;

    let eligible = is_eligible_for_discount(&session).await?;
    Ok(Json(CartView::build(&cart, eligible, &state.config().pricing)))
}

/// Get the cart count badge.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<Json<CartCountView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartCountView {
        count: cart.total_item_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;

    fn product(id: i32, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Producto {id}"),
            price: Money::new(price),
            image: None,
            description: None,
        }
    }

    #[test]
    fn test_cart_view_reflects_pricing_and_hint() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 10_000), 2);

        let view = CartView::build(&cart, false, &PricingRules::default());
        assert_eq!(view.item_count, 2);
        assert_eq!(view.pricing.subtotal, Money::new(20_000));
        assert_eq!(view.pricing.shipping, Money::new(3_000));
        assert!(!view.discount_applied);
        assert_eq!(view.remaining_for_free_shipping, Some(Money::new(5_000)));
    }

    #[test]
    fn test_cart_view_discount_applied_for_clients() {
        let mut cart = Cart::default();
        cart.add_item(&product(1, 30_000), 1);

        let view = CartView::build(&cart, true, &PricingRules::default());
        assert!(view.discount_applied);
        assert_eq!(view.pricing.discount, Money::new(1_500));
        assert_eq!(view.remaining_for_free_shipping, None);
    }

    #[test]
    fn test_empty_cart_view_has_no_discount_flag() {
        let view = CartView::build(&Cart::default(), true, &PricingRules::default());
        assert!(view.items.is_empty());
        assert!(!view.discount_applied);
    }

    #[test]
    fn test_add_request_explicit_zero_quantity_is_a_noop() {
        let body: AddToCartRequest =
            serde_json::from_str(r#"{"product_id": 1, "quantity": 0}"#).expect("deserializes");
        assert_eq!(body.quantity, Some(0));

        // The handler passes the quantity through unchanged; the store
        // treats zero as a no-op rather than adding one item
        let mut cart = Cart::default();
        cart.add_item(&product(1, 1_000), body.quantity.unwrap_or(1));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_request_omitted_quantity_defaults_to_one() {
        let body: AddToCartRequest =
            serde_json::from_str(r#"{"product_id": 1}"#).expect("deserializes");
        assert_eq!(body.quantity, None);

        let mut cart = Cart::default();
        cart.add_item(&product(1, 1_000), body.quantity.unwrap_or(1));
        assert_eq!(cart.total_item_count(), 1);
    }
}
