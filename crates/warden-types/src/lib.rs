//! Warden Types - Shared domain types
//!
//! This crate contains the types that cross the broker between the gateway
//! and the users service:
//! - User identity and roles
//! - Token kinds, token pairs and invalid-token reasons
//! - The reply envelope and the fixed operation catalogue
//! - Request/response payloads and their boundary validation

pub mod error;
pub mod operation;
pub mod payload;
pub mod reply;
pub mod token;
pub mod user;
pub mod validation;

pub use error::*;
pub use operation::*;
pub use payload::*;
pub use reply::*;
pub use token::*;
pub use user::*;
pub use validation::*;
