//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_BASE_URL` - Base URL of the backend API (catalog + orders)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_ORDER_TIMEOUT_SECS` - Order submission timeout (default: 10)
//! - `STOREFRONT_DISCOUNT_RATE` - Client discount rate (default: 0.05)
//! - `STOREFRONT_FREE_SHIPPING_THRESHOLD` - Subtotal in pesos at which
//!   shipping becomes free (default: 25000)
//! - `STOREFRONT_FLAT_SHIPPING_COST` - Shipping cost in pesos below the
//!   threshold (default: 3000)
//! - `WHATSAPP_GATEWAY_URL` - WhatsApp send endpoint base URL
//!   (default: <https://api.whatsapp.com>)
//! - `WHATSAPP_API_KEY` - Bearer token for a self-hosted WhatsApp bridge
//! - `COMPANY_WHATSAPP` - Business notification destination
//!   (default: +56948853814)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use mercadito_core::Money;

use crate::pricing::PricingRules;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the backend API serving the catalog and order endpoints
    pub api_base_url: String,
    /// Timeout for order submission requests
    pub order_timeout: Duration,
    /// Cart pricing rules (discount rate, shipping threshold and cost)
    pub pricing: PricingRules,
    /// WhatsApp side-channel configuration
    pub whatsapp: WhatsAppConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// WhatsApp side-channel configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct WhatsAppConfig {
    /// Base URL of the WhatsApp send endpoint
    pub gateway_url: String,
    /// Bearer token for a self-hosted WhatsApp bridge, if any
    pub api_key: Option<SecretString>,
    /// Destination address for business-facing order notifications
    pub company_address: String,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("gateway_url", &self.gateway_url)
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("company_address", &self.company_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let api_base_url = get_required_env("STOREFRONT_API_BASE_URL")?;
        let order_timeout = Duration::from_secs(parse_env_or(
            "STOREFRONT_ORDER_TIMEOUT_SECS",
            10,
            |s| s.parse::<u64>(),
        )?);

        let pricing = PricingRules {
            discount_rate: parse_env_or("STOREFRONT_DISCOUNT_RATE", Decimal::new(5, 2), |s| {
                s.parse::<Decimal>()
            })?,
            free_shipping_threshold: Money::new(parse_env_or(
                "STOREFRONT_FREE_SHIPPING_THRESHOLD",
                25_000,
                |s| s.parse::<i64>(),
            )?),
            flat_shipping_cost: Money::new(parse_env_or(
                "STOREFRONT_FLAT_SHIPPING_COST",
                3_000,
                |s| s.parse::<i64>(),
            )?),
        };

        let whatsapp = WhatsAppConfig::from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            api_base_url,
            order_timeout,
            pricing,
            whatsapp,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl WhatsAppConfig {
    fn from_env() -> Self {
        Self {
            gateway_url: get_env_or_default("WHATSAPP_GATEWAY_URL", "https://api.whatsapp.com"),
            api_key: get_optional_env("WHATSAPP_API_KEY").map(SecretString::from),
            company_address: get_env_or_default("COMPANY_WHATSAPP", "+56948853814"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or<T, E: std::fmt::Display>(
    key: &str,
    default: T,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => {
            parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        }
        Err(_) => Ok(default),
    }
}
