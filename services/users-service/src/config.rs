//! Configuration for the users service.

use std::time::Duration;

use warden_auth_core::AuthConfig;
use warden_broker::RedisStreamsConfig;
use warden_rpc::RpcTopology;

/// Users service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for health probes
    pub http_port: u16,

    pub database_url: String,

    pub redis_url: String,

    /// Namespace for broker stream keys
    pub stream_prefix: String,

    /// Approximate cap on entries per broker stream
    pub stream_max_len: usize,

    /// Requests in flight per operation queue
    pub prefetch: usize,

    /// How often expired token records are deleted
    pub sweep_interval: Duration,

    pub auth: AuthConfig,

    pub topology: RpcTopology,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env.required("DATABASE_URL")?;
        let redis_url = env.or("REDIS_URL", "redis://127.0.0.1:6379");
        let stream_prefix = env.or("BROKER_STREAM_PREFIX", "warden");
        let stream_max_len =
            env.parse_or("BROKER_STREAM_MAX_LEN", RedisStreamsConfig::DEFAULT_MAX_LEN)?;
        let http_port = env.parse_or("HTTP_PORT", 8081)?;
        let prefetch = env.parse_or("BROKER_PREFETCH", 1usize)?;
        let sweep_secs: u64 = env.parse_or("TOKEN_SWEEP_INTERVAL_SECS", 24 * 60 * 60)?;

        // Token settings
        let secret = env.required("JWT_SECRET_KEY")?;
        let access_secs: u64 = env.parse_or(
            "JWT_ACCESS_TOKEN_EXPIRES_IN",
            AuthConfig::DEFAULT_ACCESS_TTL.as_secs(),
        )?;
        let refresh_secs: u64 = env.parse_or(
            "JWT_REFRESH_TOKEN_EXPIRES_IN",
            AuthConfig::DEFAULT_REFRESH_TTL.as_secs(),
        )?;
        let bcrypt_cost = env.parse_or("BCRYPT_COST", AuthConfig::DEFAULT_BCRYPT_COST)?;

        // Policy flags
        let check_username = env.parse_or("CHECK_USERNAME_UNIQUENESS", true)?;
        let rotate_refresh = env.parse_or("ROTATE_REFRESH_TOKENS", false)?;

        let auth = AuthConfig::try_new(
            secret,
            env.or("JWT_AUDIENCE", "warden-users"),
            env.or("JWT_ISSUER", "warden"),
            env.or("JWT_AUTHORIZED_PARTY", "warden-gateway"),
        )
        .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
        .with_access_ttl(Duration::from_secs(access_secs))
        .with_refresh_ttl(Duration::from_secs(refresh_secs))
        .with_bcrypt_cost(bcrypt_cost)
        .with_username_uniqueness(check_username)
        .with_refresh_rotation(rotate_refresh);

        Ok(Self {
            http_port,
            database_url,
            redis_url,
            stream_prefix,
            stream_max_len: stream_max_len.max(1),
            prefetch: prefetch.max(1),
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
            auth,
            topology: RpcTopology::from_lookup(&lookup),
        })
    }
}

/// Variable access with empty values treated as unset
struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(
        &self,
        name: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
            None => Ok(default),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}
