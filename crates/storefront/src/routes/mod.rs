//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Health check
//!
//! # Products
//! GET  /products                - Product listing
//! GET  /products/{id}           - Product detail
//!
//! # Cart
//! GET  /cart                    - Cart view with pricing snapshot
//! POST /cart/add                - Add a product
//! POST /cart/update             - Replace a line quantity (0 removes)
//! POST /cart/remove             - Remove a line
//! POST /cart/clear              - Empty the cart
//! GET  /cart/count              - Item count badge
//!
//! # Checkout
//! GET  /checkout                - Shipping draft + cart view
//! PUT  /checkout/shipping       - Save the shipping draft
//! POST /checkout                - Submit the order
//! GET  /checkout/confirmation   - Last confirmation, or redirect to /cart
//! ```

pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/shipping", put(checkout::save_shipping))
        .route("/confirmation", get(checkout::confirmation))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}
