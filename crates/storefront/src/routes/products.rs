//! Product route handlers.
//!
//! Thin pass-throughs over the cached catalog client. The catalog is the
//! source of truth for names and prices; the storefront never mutates it.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use mercadito_core::ProductId;

use crate::catalog::Product;
use crate::error::Result;
use crate::state::AppState;

/// List all products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().get_products().await?;
    Ok(Json(products.as_ref().clone()))
}

/// Display a single product. Unknown ids are a 404.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state.catalog().get_product(id).await?;
    Ok(Json(product.as_ref().clone()))
}
