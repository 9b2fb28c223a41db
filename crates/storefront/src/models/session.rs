//! Session-related types.

/// Session keys for storefront data.
pub mod keys {
    /// Key for the current logged-in user, written by the auth layer.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the serialized shopping cart.
    pub const CART: &str = "cart";

    /// Key for the shipping form draft.
    pub const SHIPPING_INFO: &str = "shipping_info";

    /// Key for the most recent order confirmation view.
    pub const LAST_CONFIRMATION: &str = "last_confirmation";
}
