//! Order API client.
//!
//! The remote order boundary has a single operation: complete an order.
//! The client distinguishes three failure modes so that checkout can show
//! an actionable message: the service is unreachable, it rejected the
//! order, or it never answered. Error display texts are the user-facing
//! Spanish messages shown on the checkout screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use mercadito_core::{ChannelId, Money, OrderStatus, ProductId};

/// Customer data submitted with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub national_id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Notification metadata submitted with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    pub channel_id: ChannelId,
    pub message: String,
    pub status: OrderStatus,
}

/// One ordered product: ID and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Request body for the complete-order operation.
///
/// Built once per submission attempt and not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderRequest {
    pub customer: OrderCustomer,
    pub notification: OrderNotification,
    pub order_date: DateTime<Utc>,
    pub shipping_address: String,
    pub order_details: Vec<OrderDetail>,
}

/// Result of a completed order.
///
/// The total is a numeric amount, not a pre-formatted display string, so
/// nothing downstream has to parse a currency string back into a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(rename = "customer")]
    pub customer_name: String,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
    pub total: Money,
}

/// Errors that can occur when submitting an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Connection refused or DNS failure: the order service is not reachable.
    #[error("No se puede conectar al servidor de órdenes. Verifique que esté ejecutándose en {0}")]
    Unreachable(String),

    /// The order service answered with a non-success status.
    #[error("Error del servidor: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The request was sent but no response arrived before the timeout.
    #[error("No se recibió respuesta del servidor")]
    NoResponse,

    /// Anything else: malformed response, TLS failure, and so on.
    #[error("Error inesperado al completar la orden: {0}")]
    Unexpected(String),
}

/// The remote order boundary.
///
/// Abstracted as a trait so that checkout can be tested against fakes.
#[allow(async_fn_in_trait)]
pub trait OrderGateway {
    /// Submit an order. Called exactly once per submission attempt.
    async fn complete_order(
        &self,
        request: &CompleteOrderRequest,
    ) -> Result<OrderConfirmation, OrderError>;
}

/// Error body returned by the order API on rejection.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: String,
}

/// Client for the order endpoints of the backend API.
#[derive(Clone)]
pub struct OrdersClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OrdersClient {
    /// Create a new orders client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(api_base_url: &str, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1/orders/complete",
                api_base_url.trim_end_matches('/')
            ),
        })
    }
}

impl OrderGateway for OrdersClient {
    #[instrument(skip(self, request), fields(items = request.order_details.len()))]
    async fn complete_order(
        &self,
        request: &CompleteOrderRequest,
    ) -> Result<OrderConfirmation, OrderError> {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return Err(OrderError::Unreachable(self.endpoint.clone()));
            }
            Err(e) if e.is_timeout() => return Err(OrderError::NoResponse),
            Err(e) => return Err(OrderError::Unexpected(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            // Prefer the server-provided detail; fall back to the status text
            let message = match response.json::<ServerErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("respuesta desconocida")
                    .to_string(),
            };
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<OrderConfirmation>()
            .await
            .map_err(|e| OrderError::Unexpected(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_with_camel_case_keys() {
        let request = CompleteOrderRequest {
            customer: OrderCustomer {
                national_id: "12.345.678-9".to_string(),
                name: "Ana Rojas".to_string(),
                phone: "+56912345678".to_string(),
                email: "ana@example.com".to_string(),
                address: "Av. Italia 1234, Ñuñoa".to_string(),
            },
            notification: OrderNotification {
                channel_id: ChannelId::new(1),
                message: "Su orden ha sido creada exitosamente".to_string(),
                status: OrderStatus::Pending,
            },
            order_date: "2025-06-01T15:30:00Z".parse().expect("valid date"),
            shipping_address: "Av. Italia 1234, Ñuñoa".to_string(),
            order_details: vec![OrderDetail {
                product_id: ProductId::new(7),
                quantity: 2,
            }],
        };

        let json = serde_json::to_value(&request).expect("serializes");
        assert_eq!(json["customer"]["nationalId"], "12.345.678-9");
        assert_eq!(json["notification"]["channelId"], 1);
        assert_eq!(json["notification"]["status"], "pending");
        assert_eq!(json["orderDetails"][0]["productId"], 7);
        assert_eq!(json["orderDetails"][0]["quantity"], 2);
        assert_eq!(json["shippingAddress"], "Av. Italia 1234, Ñuñoa");
    }

    #[test]
    fn test_confirmation_deserializes_numeric_total() {
        let body = r#"{
            "orderNumber": "ORD-2025-00042",
            "status": "pending",
            "customer": "Ana Rojas",
            "shippingAddress": "Av. Italia 1234, Ñuñoa",
            "orderDate": "2025-06-01T15:30:00Z",
            "total": 23000
        }"#;

        let confirmation: OrderConfirmation = serde_json::from_str(body).expect("deserializes");
        assert_eq!(confirmation.order_number, "ORD-2025-00042");
        assert_eq!(confirmation.status, OrderStatus::Pending);
        assert_eq!(confirmation.customer_name, "Ana Rojas");
        assert_eq!(confirmation.total, Money::new(23_000));
    }
}
