//! Checkout orchestration.
//!
//! Drives a submission attempt through the state machine
//! `Idle -> Validating -> Submitting -> Succeeded | Failed`:
//!
//! 1. A per-session [`SessionGate`] rejects a second submission from the
//!    same session while one is outstanding, so duplicate orders cannot
//!    come from double-submits. Submissions from different sessions never
//!    contend.
//! 2. Validation checks the cart is non-empty and all four shipping fields
//!    are filled. A validation failure never reaches the order boundary.
//! 3. The order request is built from a snapshot of the cart and submitted
//!    exactly once. There is no automatic retry: a failed attempt ends at
//!    `Failed` and a new attempt requires a new explicit user action.
//! 4. On success the cart is cleared first, then the customer and business
//!    notifications are dispatched. Notification failures are logged and
//!    never alter the confirmed outcome. On failure the cart is untouched
//!    so the user can retry.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use mercadito_core::ChannelId;

use crate::cart::Cart;
use crate::models::CurrentUser;
use crate::pricing::{PricingRules, PricingSnapshot, compute_pricing};
use crate::services::orders::{
    CompleteOrderRequest, OrderConfirmation, OrderCustomer, OrderDetail, OrderError, OrderGateway,
    OrderNotification,
};
use crate::services::whatsapp::{MessageChannel, NotificationDispatcher, OrderSummary, SummaryItem};

/// Fixed notification channel recorded on every order.
const NOTIFICATION_CHANNEL: ChannelId = ChannelId::new(1);

/// Message recorded with the order's notification metadata.
const CREATION_MESSAGE: &str = "Su orden ha sido creada exitosamente";

/// Customer shipping data entered on the checkout form.
///
/// A user-editable draft, independent of the authenticated identity
/// record: it is seeded from the identity record when present but the
/// user can change every field before submitting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub national_id: String,
    pub address: String,
    pub phone: String,
}

impl ShippingInfo {
    /// Seed a draft from the authenticated user's identity record.
    #[must_use]
    pub fn from_user(user: &CurrentUser) -> Self {
        Self {
            full_name: user.name.clone(),
            national_id: user.national_id.clone(),
            address: user.address.clone(),
            phone: user.phone.clone(),
        }
    }

    /// Names of the fields that are still blank.
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.full_name.trim().is_empty() {
            missing.push("nombre");
        }
        if self.national_id.trim().is_empty() {
            missing.push("rut");
        }
        if self.address.trim().is_empty() {
            missing.push("dirección");
        }
        if self.phone.trim().is_empty() {
            missing.push("teléfono");
        }
        missing
    }

    /// Whether every field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Errors that end a submission attempt.
///
/// Validation errors and the in-flight rejection are raised before the
/// order boundary is contacted; [`CheckoutError::Order`] wraps failures
/// from the boundary itself. Display texts are the user-facing Spanish
/// messages shown on the checkout screen.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines. Never reaches the order boundary.
    #[error("El carrito está vacío")]
    EmptyCart,

    /// One or more shipping fields are blank. Never reaches the boundary.
    #[error("Por favor completa todos los campos del formulario: {0}")]
    IncompleteShippingInfo(String),

    /// Another submission is already outstanding.
    #[error("Ya hay un pedido en proceso, espera a que termine")]
    SubmissionInFlight,

    /// The order boundary failed; the cart was left untouched.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Result of a successful submission.
///
/// Carries the remote confirmation plus the checkout-time pricing
/// snapshot, which is the authoritative subtotal/discount/shipping
/// breakdown for the confirmation view. The notification flags record
/// best-effort dispatch results for logging and display only.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub confirmation: OrderConfirmation,
    pub pricing: PricingSnapshot,
    pub customer_notified: bool,
    pub company_notified: bool,
}

/// Per-session concurrency state for the cart and checkout flow.
///
/// One gate exists per session. [`SessionGate::begin_submission`] enforces
/// the duplicate-order invariant: while a submission for this session is
/// outstanding, a second one is rejected instead of queued.
/// [`SessionGate::lock_cart`] serializes the session's cart
/// read-modify-write cycles, including the snapshot-and-clear inside
/// [`CheckoutOrchestrator::submit`].
///
/// Callers that do both must call `begin_submission` BEFORE `lock_cart`:
/// a re-submit that queued on the cart lock first would run again once the
/// first attempt released it, producing a duplicate order.
#[derive(Debug, Default)]
pub struct SessionGate {
    cart: tokio::sync::Mutex<()>,
    in_flight: AtomicBool,
}

impl SessionGate {
    /// Serialize access to this session's cart.
    ///
    /// Held across the whole load-mutate-save cycle of a cart handler, and
    /// across the orchestrator's snapshot-and-clear during submission.
    pub async fn lock_cart(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.cart.lock().await
    }

    /// Mark a submission for this session as outstanding.
    ///
    /// The returned guard releases the flag on drop, whichever way the
    /// attempt ends.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::SubmissionInFlight`] when another
    /// submission for this session is already outstanding.
    pub fn begin_submission(&self) -> Result<SubmissionGuard<'_>, CheckoutError> {
        SubmissionGuard::acquire(&self.in_flight)
    }

    /// Whether a submission for this session is currently outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// RAII guard for the in-flight flag: released on drop.
pub struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CheckoutError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(Self(flag))
        } else {
            Err(CheckoutError::SubmissionInFlight)
        }
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives validation, order submission, and post-success notifications.
///
/// The orchestrator itself is stateless between attempts; concurrency
/// control lives in the per-session [`SessionGate`] so that one customer's
/// in-flight order never blocks another's.
pub struct CheckoutOrchestrator<G, C> {
    gateway: G,
    dispatcher: NotificationDispatcher<C>,
}

impl<G: OrderGateway, C: MessageChannel> CheckoutOrchestrator<G, C> {
    /// Create an orchestrator over an order gateway and a dispatcher.
    pub fn new(gateway: G, dispatcher: NotificationDispatcher<C>) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    /// Run one submission attempt.
    ///
    /// On success the cart is cleared. On any error the cart is exactly as
    /// it was before the call. The caller holds the session's
    /// [`SubmissionGuard`] and cart lock for the duration of the call.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] describing why the attempt ended at
    /// `Failed`; see the error type for the taxonomy.
    pub async fn submit(
        &self,
        cart: &mut Cart,
        shipping: &ShippingInfo,
        email: &str,
        eligible_for_discount: bool,
        rules: &PricingRules,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // Validating
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let missing = shipping.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::IncompleteShippingInfo(missing.join(", ")));
        }

        let pricing = compute_pricing(cart, eligible_for_discount, rules);
        let request = CompleteOrderRequest {
            customer: OrderCustomer {
                national_id: shipping.national_id.clone(),
                name: shipping.full_name.clone(),
                phone: shipping.phone.clone(),
                email: email.to_string(),
                address: shipping.address.clone(),
            },
            notification: OrderNotification {
                channel_id: NOTIFICATION_CHANNEL,
                message: CREATION_MESSAGE.to_string(),
                status: mercadito_core::OrderStatus::Pending,
            },
            order_date: Utc::now(),
            shipping_address: shipping.address.clone(),
            order_details: cart
                .lines()
                .iter()
                .map(|line| OrderDetail {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        };

        // Submitting: exactly one boundary call per attempt
        let confirmation = self.gateway.complete_order(&request).await?;

        // Succeeded: snapshot the lines for the notifications, then clear
        let items: Vec<SummaryItem> = cart
            .lines()
            .iter()
            .map(|line| SummaryItem {
                name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();
        cart.clear();

        let summary = OrderSummary {
            order_number: confirmation.order_number.clone(),
            customer_name: confirmation.customer_name.clone(),
            total: confirmation.total,
            order_date: confirmation.order_date,
            shipping_address: confirmation.shipping_address.clone(),
            items,
        };

        let customer_notified = match self.dispatcher.notify_customer(&shipping.phone, &summary).await
        {
            Ok(receipt) => {
                debug!(message_id = %receipt.message_id, "customer notification sent");
                true
            }
            Err(e) => {
                warn!(error = %e, order = %summary.order_number, "customer notification failed after confirmed order");
                false
            }
        };
        let company_notified = match self.dispatcher.notify_company(&summary).await {
            Ok(receipt) => {
                debug!(message_id = %receipt.message_id, "company notification sent");
                true
            }
            Err(e) => {
                warn!(error = %e, order = %summary.order_number, "company notification failed after confirmed order");
                false
            }
        };

        Ok(CheckoutOutcome {
            confirmation,
            pricing,
            customer_notified,
            company_notified,
        })
    }
}
