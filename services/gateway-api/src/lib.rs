//! Warden Gateway API
//!
//! HTTP front door. Validates request shape, forwards each auth operation
//! to the users service over the broker, and keeps the token pair in
//! cookies.

pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use state::AppState;

/// Full gateway router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/sign-up", post(handlers::sign_up))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/users/me", get(handlers::me))
        .route("/users/one/:id", get(handlers::one));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
