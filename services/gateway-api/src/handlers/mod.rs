//! HTTP handlers

mod auth;
mod health;
mod users;

pub use auth::{logout, refresh, sign_in, sign_up};
pub use health::health;
pub use users::{me, one, ACCESS_DENIED};
