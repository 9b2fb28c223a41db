//! External service clients.
//!
//! - [`orders`] - order API client (the remote order boundary)
//! - [`whatsapp`] - WhatsApp side-channel dispatcher

pub mod orders;
pub mod whatsapp;
