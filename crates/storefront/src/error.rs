//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures internal errors to
//! Sentry before responding to the client. All route handlers should
//! return `Result<T, AppError>`. Notification failures never appear here:
//! they are consumed (and logged) inside the checkout orchestrator.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout submission failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog API operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Session load/store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error should be captured to Sentry.
    ///
    /// User-recoverable checkout and catalog conditions are expected
    /// traffic; infrastructure failures are not.
    fn is_internal(&self) -> bool {
        match self {
            Self::Session(_) | Self::Internal(_) => true,
            Self::Checkout(CheckoutError::Order(OrderError::Unexpected(_))) => true,
            Self::Checkout(_) | Self::Catalog(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart | CheckoutError::IncompleteShippingInfo(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CheckoutError::SubmissionInFlight => StatusCode::CONFLICT,
                CheckoutError::Order(order) => match order {
                    OrderError::Unreachable(_) | OrderError::Rejected { .. } => {
                        StatusCode::BAD_GATEWAY
                    }
                    OrderError::NoResponse => StatusCode::GATEWAY_TIMEOUT,
                    OrderError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
            },
            Self::Catalog(err) => match err {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Http(_) | CatalogError::Api { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Checkout errors carry the user-facing message; internal details
        // are never exposed to clients
        let message = match &self {
            Self::Checkout(err) => err.to_string(),
            Self::Catalog(CatalogError::NotFound(id)) => format!("Producto no encontrado: {id}"),
            Self::Catalog(_) => "External service error".to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(what) => format!("Bad request: {what}"),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
