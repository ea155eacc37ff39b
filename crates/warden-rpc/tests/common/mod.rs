//! Shared helpers for RPC integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_broker::{MemoryBroker, SharedTransport};
use warden_rpc::{ClientOptions, HandlerError, RpcClient, RpcServer, RpcTopology, ServerHandle};
use warden_types::Operation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub n: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub n: u32,
}

pub fn transport() -> (MemoryBroker, SharedTransport) {
    let broker = MemoryBroker::new();
    let shared: SharedTransport = Arc::new(broker.clone());
    (broker, shared)
}

/// SignIn echoes, SignUp rejects, Logout panics on n == 0
pub fn test_server(transport: SharedTransport) -> RpcServer {
    RpcServer::new(transport, RpcTopology::default())
        .with_prefetch(4)
        .route(Operation::SignIn, |ping: Ping| async move {
            Ok::<_, HandlerError>(Pong { n: ping.n })
        })
        .route(Operation::SignUp, |_: Ping| async move {
            Err::<Pong, _>(HandlerError::domain("Email is already occupied"))
        })
        .route(Operation::Logout, |ping: Ping| async move {
            if ping.n == 0 {
                panic!("handler bug");
            }
            Ok::<_, HandlerError>(Pong { n: ping.n })
        })
}

pub async fn start_server(transport: SharedTransport) -> ServerHandle {
    test_server(transport).serve().await.unwrap()
}

pub async fn start_client(transport: SharedTransport, timeout: Duration) -> RpcClient {
    RpcClient::start(
        transport,
        RpcTopology::default(),
        ClientOptions::default().with_timeout(timeout),
    )
    .await
    .unwrap()
}
