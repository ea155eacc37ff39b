//! Configuration for the gateway.

use std::time::Duration;

use warden_broker::RedisStreamsConfig;
use warden_rpc::RpcTopology;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,

    pub redis_url: String,

    /// Namespace for broker stream keys
    pub stream_prefix: String,

    /// Approximate cap on entries per broker stream
    pub stream_max_len: usize,

    /// How long one RPC waits for its reply
    pub request_timeout: Duration,

    /// Mark auth cookies `Secure`
    pub cookie_secure: bool,

    pub topology: RpcTopology,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let http_port = match get("HTTP_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("HTTP_PORT"))?,
            None => 8080,
        };
        let timeout_ms: u64 = match get("MICROSERVICE_REQUEST_TIMEOUT_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("MICROSERVICE_REQUEST_TIMEOUT_MS"))?,
            None => 5000,
        };
        let stream_max_len: usize = match get("BROKER_STREAM_MAX_LEN") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("BROKER_STREAM_MAX_LEN"))?,
            None => RedisStreamsConfig::DEFAULT_MAX_LEN,
        };
        let cookie_secure = match get("COOKIE_SECURE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("COOKIE_SECURE"))?,
            None => false,
        };

        Ok(Self {
            http_port,
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            stream_prefix: get("BROKER_STREAM_PREFIX").unwrap_or_else(|| "warden".to_string()),
            stream_max_len: stream_max_len.max(1),
            request_timeout: Duration::from_millis(timeout_ms),
            cookie_secure,
            topology: RpcTopology::from_lookup(&lookup),
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
