//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tower_sessions::session::Id;

use crate::catalog::CatalogClient;
use crate::checkout::{CheckoutOrchestrator, SessionGate};
use crate::config::StorefrontConfig;
use crate::services::orders::OrdersClient;
use crate::services::whatsapp::{DispatchError, NotificationDispatcher, WhatsAppGateway};

/// The concrete checkout orchestrator wired to production clients.
pub type Checkout = CheckoutOrchestrator<OrdersClient, WhatsAppGateway>;

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    WhatsApp(#[from] DispatchError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the catalog client and the checkout
/// orchestrator.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogClient,
    checkout: Checkout,
    gates: SessionGates,
}

/// Registry of per-session [`SessionGate`]s, keyed by session id.
///
/// Backed by a bounded moka cache: gates for sessions idle longer than the
/// TTI are evicted; an in-use gate stays alive through its `Arc` and the
/// TTI far exceeds any request's duration.
struct SessionGates {
    gates: moka::sync::Cache<Id, Arc<SessionGate>>,
}

impl SessionGates {
    fn new() -> Self {
        Self {
            gates: moka::sync::Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(3600)) // 1 hour
                .build(),
        }
    }

    /// The gate for a session id, creating it on first use.
    ///
    /// A session without an id has never been saved, so no other request
    /// can share it yet; it gets a private gate.
    fn for_session(&self, id: Option<Id>) -> Arc<SessionGate> {
        id.map_or_else(
            || Arc::new(SessionGate::default()),
            |id| self.gates.get_with(id, || Arc::new(SessionGate::default())),
        )
    }
}

impl AppState {
    /// Create a new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = CatalogClient::new(&config.api_base_url);
        let gateway = OrdersClient::new(&config.api_base_url, config.order_timeout)?;
        let channel = WhatsAppGateway::new(&config.whatsapp)?;
        let dispatcher = NotificationDispatcher::new(channel, &config.whatsapp.company_address);
        let checkout = CheckoutOrchestrator::new(gateway, dispatcher);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                checkout,
                gates: SessionGates::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &Checkout {
        &self.inner.checkout
    }

    /// Get the concurrency gate for a session.
    #[must_use]
    pub fn session_gate(&self, id: Option<Id>) -> Arc<SessionGate> {
        self.inner.gates.for_session(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_session_gets_the_same_gate() {
        let gates = SessionGates::new();
        let first = gates.for_session(Some(Id(7)));
        let again = gates.for_session(Some(Id(7)));
        let other = gates.for_session(Some(Id(8)));

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_unsaved_session_gets_a_private_gate() {
        let gates = SessionGates::new();
        let first = gates.for_session(None);
        let second = gates.for_session(None);

        assert!(!Arc::ptr_eq(&first, &second));
    }
}
