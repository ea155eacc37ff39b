//! Common test utilities for warden-auth-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use warden_auth_core::{AuthConfig, AuthService, ManualClock, TokenService};
use warden_db::{MemoryTokenRepository, MemoryUserRepository};
use warden_types::SignUpRequest;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long!!";

pub fn test_config() -> AuthConfig {
    AuthConfig::try_new(SECRET, "warden-users", "warden", "warden-gateway")
        .expect("valid config")
        .with_access_ttl(Duration::from_secs(15 * 60))
        .with_refresh_ttl(Duration::from_secs(24 * 60 * 60))
        .with_bcrypt_cost(4)
}

pub struct Harness {
    pub service: AuthService<MemoryUserRepository, MemoryTokenRepository>,
    pub users: Arc<MemoryUserRepository>,
    pub tokens: Arc<MemoryTokenRepository>,
    pub clock: ManualClock,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: AuthConfig) -> Harness {
    let users = Arc::new(MemoryUserRepository::new());
    let tokens = Arc::new(MemoryTokenRepository::new());
    let clock = ManualClock::default();
    let service = AuthService::new(config, Arc::clone(&users), Arc::clone(&tokens))
        .expect("service")
        .with_clock(Arc::new(clock.clone()));
    Harness {
        service,
        users,
        tokens,
        clock,
    }
}

pub fn token_service(
    repo: Arc<MemoryTokenRepository>,
    clock: ManualClock,
) -> TokenService<MemoryTokenRepository> {
    TokenService::new(&test_config(), repo)
        .expect("token service")
        .with_clock(Arc::new(clock))
}

pub fn sign_up_request(email: &str) -> SignUpRequest {
    SignUpRequest {
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        first_name: "Ray".to_string(),
        last_name: "Bradbury".to_string(),
        middle_name: None,
        username: None,
    }
}
