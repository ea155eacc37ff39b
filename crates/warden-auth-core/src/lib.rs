//! Warden Auth Core - Authentication business logic
//!
//! Token issuance and verification, password hashing, and the
//! sign-up / sign-in / refresh / authenticate / logout flows that the
//! users service exposes over the broker.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod password;
pub mod service;
pub mod sweep;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use crypto::{constant_time_str_eq, strip_bearer, HmacKey, HmacKeyError};
pub use error::AuthError;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use sweep::{SweeperHandle, TokenSweeper};
pub use token::{Claims, IssuedToken, TokenService, TokenStatus};
