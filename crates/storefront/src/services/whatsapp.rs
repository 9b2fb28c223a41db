//! WhatsApp side-channel dispatcher.
//!
//! After an order is confirmed the storefront sends two human-readable
//! summaries over WhatsApp: a confirmation to the customer and an order
//! detail to the business. Dispatch is fire-and-forget: failures are
//! reported to the caller as a result, logged, and never escalated into a
//! checkout failure.
//!
//! The concrete transport is an HTTP adapter behind the [`MessageChannel`]
//! trait, so tests can substitute a recording channel.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use mercadito_core::Money;

use crate::config::WhatsAppConfig;

/// Chilean country calling code.
const COUNTRY_CODE: &str = "56";

/// Errors that can occur when dispatching a message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Gateway { status: u16, message: String },

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Receipt for a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub message_id: String,
}

/// A fire-and-forget message channel.
///
/// `send` takes a canonical destination address and a message body and
/// returns a structured success/failure result. The checkout orchestrator
/// logs failures but never lets them alter a confirmed order.
#[allow(async_fn_in_trait)]
pub trait MessageChannel {
    async fn send(&self, destination: &str, body: &str) -> Result<DispatchReceipt, DispatchError>;
}

/// Normalize a phone-number-like address into canonical `+56...` form.
///
/// Separators (spaces, dashes, parentheses) are stripped, then:
/// - addresses already starting with `+` pass through unchanged,
/// - a leading `56` gets a `+` prepended,
/// - a leading `9` (national mobile format) becomes `+569...`,
/// - anything else gets the full `+56` country code prepended.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let clean: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if clean.starts_with('+') {
        clean
    } else if clean.starts_with(COUNTRY_CODE) {
        format!("+{clean}")
    } else {
        // National format, mobile ("9...") or not: prepend the country code
        format!("+{COUNTRY_CODE}{clean}")
    }
}

/// One line of an itemized order breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl SummaryItem {
    fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Structured order summary used to render notification messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_number: String,
    pub customer_name: String,
    pub total: Money,
    pub order_date: DateTime<Utc>,
    pub shipping_address: String,
    pub items: Vec<SummaryItem>,
}

/// Format an order date the way it is shown to Chilean customers.
fn format_order_date(date: DateTime<Utc>) -> String {
    date.format("%d-%m-%Y %H:%M").to_string()
}

/// Customer-facing confirmation message.
fn customer_message(summary: &OrderSummary) -> String {
    format!(
        "🛒 *Confirmación de Pedido*\n\n\
         ¡Hola {}!\n\n\
         Tu pedido ha sido confirmado exitosamente:\n\n\
         📋 *Número de orden:* {}\n\
         💰 *Total:* {}\n\
         📅 *Fecha:* {}\n\n\
         Nos pondremos en contacto contigo pronto para coordinar la entrega.\n\n\
         ¡Gracias por tu compra! 🙏",
        summary.customer_name,
        summary.order_number,
        summary.total,
        format_order_date(summary.order_date),
    )
}

/// Business-facing message: adds the shipping address and, when line items
/// are available, an itemized breakdown with per-line and subtotal amounts.
fn company_message(summary: &OrderSummary) -> String {
    let mut message = format!(
        "🛒 *Nuevo Pedido Recibido*\n\n\
         📋 *Número de orden:* {}\n\
         👤 *Cliente:* {}\n\
         📍 *Dirección:* {}\n\
         📅 *Fecha:* {}\n\n",
        summary.order_number,
        summary.customer_name,
        summary.shipping_address,
        format_order_date(summary.order_date),
    );

    if summary.items.is_empty() {
        message.push_str(&format!("💰 *Total:* {}\n\n", summary.total));
    } else {
        message.push_str("📝 *Detalle de productos:*\n");
        let mut subtotal = Money::ZERO;
        for (index, item) in summary.items.iter().enumerate() {
            let line_total = item.line_total();
            subtotal += line_total;
            message.push_str(&format!(
                "{}. {} - {} x {} = {}\n",
                index + 1,
                item.name,
                item.quantity,
                item.unit_price,
                line_total,
            ));
        }
        message.push_str(&format!("\n*Subtotal:* {subtotal}\n"));
        message.push_str(&format!("*Total:* {}\n\n", summary.total));
    }

    message.push_str("Hola, este es el detalle de mi pedido.");
    message
}

/// HTTP adapter for the WhatsApp send endpoint.
///
/// Sends `GET {gateway}/send?phone=<digits>&text=<encoded>`, the contract
/// of both the public `api.whatsapp.com` endpoint and self-hosted bridges
/// that mimic it. A 2xx response counts as dispatched; the receipt carries
/// a locally generated message ID.
#[derive(Clone)]
pub struct WhatsAppGateway {
    client: reqwest::Client,
    base_url: String,
}

impl WhatsAppGateway {
    /// Create a new gateway adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the API key
    /// is not a valid header value.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, DispatchError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key.expose_secret());
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| DispatchError::Config(format!("invalid API key format: {e}")))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MessageChannel for WhatsAppGateway {
    #[instrument(skip(self, body), fields(destination = %destination))]
    async fn send(&self, destination: &str, body: &str) -> Result<DispatchReceipt, DispatchError> {
        let phone = destination.trim_start_matches('+');
        let url = format!(
            "{}/send?phone={phone}&text={}",
            self.base_url,
            urlencoding::encode(body)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DispatchError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        Ok(DispatchReceipt {
            message_id: format!("whatsapp_{}", Utc::now().timestamp_millis()),
        })
    }
}

/// Formats order summaries and forwards them over a [`MessageChannel`].
///
/// Holds the fixed business destination; customer destinations come from
/// the shipping form and are normalized per message.
pub struct NotificationDispatcher<C> {
    pub(crate) channel: C,
    company_address: String,
}

impl<C: MessageChannel> NotificationDispatcher<C> {
    /// Create a dispatcher. The company address is normalized once here.
    pub fn new(channel: C, company_address: &str) -> Self {
        Self {
            channel,
            company_address: normalize_phone(company_address),
        }
    }

    /// Send the customer-facing confirmation.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails; the caller decides whether
    /// that matters (checkout only logs it).
    pub async fn notify_customer(
        &self,
        phone: &str,
        summary: &OrderSummary,
    ) -> Result<DispatchReceipt, DispatchError> {
        self.channel
            .send(&normalize_phone(phone), &customer_message(summary))
            .await
    }

    /// Send the business-facing order detail to the fixed company address.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails.
    pub async fn notify_company(
        &self,
        summary: &OrderSummary,
    ) -> Result<DispatchReceipt, DispatchError> {
        self.channel
            .send(&self.company_address, &company_message(summary))
            .await
    }
}
