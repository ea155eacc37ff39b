//! Warden Gateway API
//!
//! HTTP front door for sign-up, sign-in, refresh, logout and the current
//! user, backed by the users service over the broker.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use gateway_api::{router, AppState, Config};
use tracing_subscriber::EnvFilter;
use warden_broker::{RedisStreamsConfig, RedisStreamsTransport, SharedTransport};
use warden_rpc::{ClientOptions, RpcClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Warden Gateway API");

    let config = Config::from_env()?;

    let transport: SharedTransport = Arc::new(
        RedisStreamsTransport::connect(RedisStreamsConfig::new(
            config.redis_url.clone(),
            config.stream_prefix.clone(),
        )
        .with_max_len(config.stream_max_len))
        .await
        .context("broker connection failed")?,
    );
    let rpc = Arc::new(
        RpcClient::start(
            Arc::clone(&transport),
            config.topology.clone(),
            ClientOptions::default().with_timeout(config.request_timeout),
        )
        .await?,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let app = router(AppState::new(Arc::clone(&rpc), config));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    rpc.shutdown().await;
    transport.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
