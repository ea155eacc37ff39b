//! In-process users service: memory broker, memory repositories

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use users_service::build_server;
use warden_auth_core::{AuthConfig, AuthService, ManualClock};
use warden_broker::{MemoryBroker, SharedTransport};
use warden_db::{MemoryTokenRepository, MemoryUserRepository};
use warden_rpc::{ClientOptions, RpcClient, RpcTopology, ServerHandle};
use warden_types::SignUpRequest;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long!!";

pub struct Stack {
    pub client: RpcClient,
    pub server: ServerHandle,
    pub users: Arc<MemoryUserRepository>,
    pub tokens: Arc<MemoryTokenRepository>,
    pub clock: ManualClock,
}

pub fn test_config() -> AuthConfig {
    AuthConfig::try_new(SECRET, "warden-users", "warden", "warden-gateway")
        .expect("valid config")
        .with_refresh_ttl(Duration::from_secs(24 * 60 * 60))
        .with_bcrypt_cost(4)
}

pub async fn stack() -> Stack {
    let transport: SharedTransport = Arc::new(MemoryBroker::new());
    let users = Arc::new(MemoryUserRepository::new());
    let tokens = Arc::new(MemoryTokenRepository::new());
    let clock = ManualClock::default();

    let auth = AuthService::new(test_config(), Arc::clone(&users), Arc::clone(&tokens))
        .expect("service")
        .with_clock(Arc::new(clock.clone()));

    let server = build_server(Arc::clone(&transport), RpcTopology::default(), Arc::new(auth))
        .serve()
        .await
        .expect("serve");
    let client = RpcClient::start(
        transport,
        RpcTopology::default(),
        ClientOptions::default().with_timeout(Duration::from_secs(10)),
    )
    .await
    .expect("client");

    Stack {
        client,
        server,
        users,
        tokens,
        clock,
    }
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
