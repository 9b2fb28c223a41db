//! Checkout route handlers.
//!
//! The shipping draft lives in the session, seeded from the authenticated
//! user's identity record the first time the checkout page is shown. A
//! successful submission replaces the session cart with the cleared one and
//! stores the confirmation view, which the confirmation page reads back.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use mercadito_core::{Money, OrderStatus};

use crate::checkout::{CheckoutOutcome, ShippingInfo};
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::pricing::PricingSnapshot;
use crate::routes::cart::{CartView, current_user, is_eligible_for_discount, load_cart, save_cart};
use crate::state::AppState;

// =============================================================================
// View types
// =============================================================================

/// Checkout page data: the shipping draft plus the current cart view.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub shipping: ShippingInfo,
    pub cart: CartView,
}

/// Confirmation page data, stored in the session after a successful
/// submission.
///
/// The `pricing` breakdown is the checkout-time snapshot, not a split
/// derived from the remote total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationView {
    pub order_number: String,
    pub status: OrderStatus,
    pub customer_name: String,
    pub shipping_address: String,
    pub order_date: DateTime<Utc>,
    pub total: Money,
    pub pricing: PricingSnapshot,
    pub customer_notified: bool,
    pub company_notified: bool,
}

impl From<CheckoutOutcome> for ConfirmationView {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            order_number: outcome.confirmation.order_number,
            status: outcome.confirmation.status,
            customer_name: outcome.confirmation.customer_name,
            shipping_address: outcome.confirmation.shipping_address,
            order_date: outcome.confirmation.order_date,
            total: outcome.confirmation.total,
            pricing: outcome.pricing,
            customer_notified: outcome.customer_notified,
            company_notified: outcome.company_notified,
        }
    }
}

// =============================================================================
// Request types
// =============================================================================

/// Submit checkout request body.
///
/// Both fields are optional: omitted ones fall back to the session draft
/// and the authenticated user's email.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitCheckoutRequest {
    pub shipping: Option<ShippingInfo>,
    pub email: Option<String>,
}

// =============================================================================
// Session helpers
// =============================================================================

/// The shipping draft for this session, seeding it from the identity
/// record on first access.
async fn load_shipping_draft(session: &Session) -> Result<ShippingInfo> {
    if let Some(draft) = session
        .get::<ShippingInfo>(session_keys::SHIPPING_INFO)
        .await?
    {
        return Ok(draft);
    }
    Ok(current_user(session)
        .await?
        .map(|user| ShippingInfo::from_user(&user))
        .unwrap_or_default())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page: shipping draft plus cart view.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutView>> {
    let shipping = load_shipping_draft(&session).await?;
    let cart = load_cart(&session).await?;
    let eligible = is_eligible_for_discount(&session).await?;

    Ok(Json(CheckoutView {
        shipping,
        cart: CartView::build(&cart, eligible, &state.config().pricing),
    }))
}

/// Save the shipping draft. Partial drafts are accepted; completeness is
/// only enforced at submission.
#[instrument(skip(session, body))]
pub async fn save_shipping(
    session: Session,
    Json(body): Json<ShippingInfo>,
) -> Result<Json<ShippingInfo>> {
    session.insert(session_keys::SHIPPING_INFO, &body).await?;
    Ok(Json(body))
}

/// Submit the order.
///
/// Runs one attempt through the orchestrator. On success the session cart
/// is replaced with the cleared one and the confirmation view is stored
/// for the confirmation page.
#[instrument(skip(state, session, body))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    body: Option<Json<SubmitCheckoutRequest>>,
) -> Result<Json<ConfirmationView>> {
    let Json(body) = body.unwrap_or_default();

    let shipping = match body.shipping {
        Some(shipping) => {
            session.insert(session_keys::SHIPPING_INFO, &shipping).await?;
            shipping
        }
        None => load_shipping_draft(&session).await?,
    };

    let user = current_user(&session).await?;
    let email = body
        .email
        .or_else(|| user.as_ref().map(|user| user.email.clone()))
        .ok_or_else(|| {
            AppError::BadRequest("Falta el correo electrónico del cliente".to_string())
        })?;
    let eligible = user.as_ref().is_some_and(|user| user.is_client);

    // Reject a concurrent re-submit from this session up front, then hold
    // the cart lock across snapshot, boundary call, and clear
    let gate = state.session_gate(session.id());
    let _submission = gate.begin_submission()?;
    let _cart_lock = gate.lock_cart().await;

    let mut cart = load_cart(&session).await?;
    let outcome = state
        .checkout()
        .submit(&mut cart, &shipping, &email, eligible, &state.config().pricing)
        .await?;

    // The orchestrator cleared the cart; persist that before answering
    save_cart(&session, &cart).await?;

    let view = ConfirmationView::from(outcome);
    session
        .insert(session_keys::LAST_CONFIRMATION, &view)
        .await?;

    info!(
        order = %view.order_number,
        total = %view.total,
        customer_notified = view.customer_notified,
        company_notified = view.company_notified,
        "order confirmed"
    );
    Ok(Json(view))
}

/// Display the last confirmation, or send the user back to the cart when
/// there is none (direct navigation, expired session).
#[instrument(skip(session))]
pub async fn confirmation(session: Session) -> Result<Response> {
    match session
        .get::<ConfirmationView>(session_keys::LAST_CONFIRMATION)
        .await?
    {
        Some(view) => Ok(Json(view).into_response()),
        None => Ok(Redirect::to("/cart").into_response()),
    }
}
