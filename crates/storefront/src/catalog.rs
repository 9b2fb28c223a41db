//! Catalog API client.
//!
//! Read-only source of priced products, served by the backend API.
//! Responses are cached with `moka` (5-minute TTL) since the catalog
//! changes rarely compared to how often carts read it.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use mercadito_core::{Money, ProductId};

/// A priced, identified product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Product not found.
    #[error("product not found: {0}")]
    NotFound(ProductId),
}

/// Cached catalog values.
#[derive(Clone)]
enum CacheValue {
    Product(Arc<Product>),
    ProductList(Arc<Vec<Product>>),
}

/// Client for the catalog endpoints of the backend API.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(api_base_url: &str) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base_url: api_base_url.trim_end_matches('/').to_string(),
                cache,
            }),
        }
    }

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::ProductList(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let url = format!("{}/v1/products", self.inner.base_url);
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let products: Arc<Vec<Product>> = Arc::new(response.json().await?);
        self.inner
            .cache
            .insert(cache_key, CacheValue::ProductList(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the product does not exist, or
    /// another error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Arc<Product>, CatalogError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let url = format!("{}/v1/products/{id}", self.inner.base_url);
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let product: Arc<Product> = Arc::new(response.json().await?);
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Arc::clone(&product)))
            .await;

        Ok(product)
    }
}
