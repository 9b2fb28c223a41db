//! Session-stored user identity.

use serde::{Deserialize, Serialize};

/// The current user, as stored in the session by the upstream auth layer.
///
/// The storefront consumes this record: it seeds the shipping form from it
/// and reads `is_client` as the discount-eligibility flag. It never writes
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub national_id: String,
    /// Registered clients get the percentage discount at checkout.
    pub is_client: bool,
}
