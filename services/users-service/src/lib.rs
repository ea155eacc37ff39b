//! Warden Users Service
//!
//! Owns the user directory and token records. Serves the five auth
//! operations over the broker and a small HTTP surface for probes.

pub mod config;
pub mod handlers;
pub mod health;

pub use config::{Config, ConfigError};
pub use handlers::build_server;
