//! Warden Users Service
//!
//! Serves sign-up, sign-in, refresh, authenticate and logout over the
//! broker, sweeps expired token records, and exposes health probes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use users_service::{build_server, health, Config};
use warden_auth_core::{AuthService, TokenSweeper};
use warden_broker::{RedisStreamsConfig, RedisStreamsTransport, SharedTransport};
use warden_db::{create_pool, run_migrations, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Warden Users Service");

    let config = Config::from_env()?;

    // Broker first: without it there is nothing to serve
    let transport: SharedTransport = Arc::new(
        RedisStreamsTransport::connect(RedisStreamsConfig::new(
            config.redis_url.clone(),
            config.stream_prefix.clone(),
        )
        .with_max_len(config.stream_max_len))
        .await
        .context("broker connection failed")?,
    );
    transport
        .declare(&config.topology.queue_bindings())
        .await
        .context("failed to declare broker topology")?;

    // Database
    let pool = create_pool(&config.database_url)
        .await
        .context("database connection failed")?;
    run_migrations(&pool).await?;
    let repos = Repositories::new(pool.clone());
    let users = Arc::new(repos.users);
    let tokens = Arc::new(repos.tokens);

    let auth = Arc::new(AuthService::new(
        config.auth.clone(),
        users,
        Arc::clone(&tokens),
    )?);

    let server = build_server(Arc::clone(&transport), config.topology.clone(), auth)
        .with_prefetch(config.prefetch)
        .serve()
        .await?;

    let sweeper = TokenSweeper::new(tokens, config.sweep_interval).spawn();

    // Health probes
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, health::router(pool))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    server.shutdown().await;
    sweeper.shutdown().await;
    transport.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
