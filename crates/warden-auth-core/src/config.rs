//! Configuration types for the auth core

use std::time::Duration;

use crate::crypto::HmacKey;
use crate::AuthError;

/// Auth core configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret used both to sign tokens and to fingerprint them
    pub secret: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `azp` claim
    pub authorized_party: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Reject sign-ups whose username is already taken
    pub check_username_uniqueness: bool,
    /// Blacklist the presented refresh token when a refresh succeeds
    pub rotate_refresh_tokens: bool,
}

impl AuthConfig {
    pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
    pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
    pub const DEFAULT_BCRYPT_COST: u32 = 10;
    /// Longest lifetime accepted for either token kind
    pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

    /// Create a new auth config.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] if the secret is shorter than
    /// [`HmacKey::MIN_KEY_LENGTH`] bytes.
    pub fn try_new(
        secret: impl Into<String>,
        audience: impl Into<String>,
        issuer: impl Into<String>,
        authorized_party: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let secret = secret.into();
        HmacKey::new(&secret).map_err(|e| AuthError::Configuration(e.to_string()))?;
        Ok(Self {
            secret,
            audience: audience.into(),
            issuer: issuer.into(),
            authorized_party: authorized_party.into(),
            access_ttl: Self::DEFAULT_ACCESS_TTL,
            refresh_ttl: Self::DEFAULT_REFRESH_TTL,
            bcrypt_cost: Self::DEFAULT_BCRYPT_COST,
            check_username_uniqueness: true,
            rotate_refresh_tokens: false,
        })
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_username_uniqueness(mut self, enabled: bool) -> Self {
        self.check_username_uniqueness = enabled;
        self
    }

    pub fn with_refresh_rotation(mut self, enabled: bool) -> Self {
        self.rotate_refresh_tokens = enabled;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("authorized_party", &self.authorized_party)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("check_username_uniqueness", &self.check_username_uniqueness)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let result = AuthConfig::try_new("short", "aud", "iss", "azp");
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn test_defaults_and_builders() {
        let config = AuthConfig::try_new("k".repeat(32), "aud", "iss", "azp")
            .unwrap()
            .with_access_ttl(Duration::from_secs(60))
            .with_refresh_rotation(true);
        assert_eq!(config.access_ttl, Duration::from_secs(60));
        assert_eq!(config.refresh_ttl, AuthConfig::DEFAULT_REFRESH_TTL);
        assert!(config.check_username_uniqueness);
        assert!(config.rotate_refresh_tokens);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = AuthConfig::try_new("s".repeat(40), "aud", "iss", "azp").unwrap();
        assert!(!format!("{config:?}").contains(&"s".repeat(40)));
    }
}
