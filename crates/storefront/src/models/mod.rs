//! Shared data models.

pub mod session;
pub mod user;

pub use session::keys as session_keys;
pub use user::CurrentUser;
