//! Token issuance and verification
//!
//! Tokens are HS256 JWTs. Every verification re-checks the signature, the
//! persisted blacklist flag and the expiry; nothing is cached between calls.
//!
//! Verification order:
//! 1. signature, `aud`, `iss`, `azp`, `typ` (any failure: cannot be decrypted)
//! 2. persisted record, matched by fingerprint: blacklisted
//! 3. `exp` against the clock: expired
//! 4. refresh tokens without a record: not found

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_db::{CreateToken, TokenRepository};
use warden_types::{InvalidTokenReason, TokenKind, TokenPair, UserId};

use crate::clock::{Clock, SystemClock};
use crate::crypto::{constant_time_str_eq, strip_bearer, HmacKey};
use crate::{AuthConfig, AuthError};

/// Signed claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub azp: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per token, so two tokens minted in the same second differ
    pub jti: String,
    pub typ: TokenKind,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of [`TokenService::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid { user_id: UserId },
    Invalid(InvalidTokenReason),
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Issues, verifies and revokes tokens
pub struct TokenService<T: TokenRepository> {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    hmac: HmacKey,
    authorized_party: String,
    audience: String,
    issuer: String,
    access_ttl: ChronoDuration,
    refresh_ttl: ChronoDuration,
    repo: Arc<T>,
    clock: Arc<dyn Clock>,
}

fn checked_ttl(kind: &str, ttl: std::time::Duration) -> Result<ChronoDuration, AuthError> {
    if ttl > AuthConfig::MAX_TTL {
        return Err(AuthError::Configuration(format!(
            "{kind} ttl exceeds {} days",
            AuthConfig::MAX_TTL.as_secs() / 86_400
        )));
    }
    ChronoDuration::from_std(ttl).map_err(|e| AuthError::Configuration(format!("{kind} ttl: {e}")))
}

impl<T: TokenRepository> TokenService<T> {
    /// Create a token service on the wall clock
    pub fn new(config: &AuthConfig, repo: Arc<T>) -> Result<Self, AuthError> {
        let hmac =
            HmacKey::new(&config.secret).map_err(|e| AuthError::Configuration(e.to_string()))?;
        let access_ttl = checked_ttl("access", config.access_ttl)?;
        let refresh_ttl = checked_ttl("refresh", config.refresh_ttl)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&config.audience]);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        // Expiry is judged against our own clock after the blacklist check
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            hmac,
            authorized_party: config.authorized_party.clone(),
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            access_ttl,
            refresh_ttl,
            repo,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Storage key for a raw token
    pub fn fingerprint(&self, raw_token: &str) -> String {
        self.hmac.fingerprint(raw_token)
    }

    fn ttl(&self, kind: TokenKind) -> ChronoDuration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn sign(
        &self,
        user_id: UserId,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now.checked_add_signed(self.ttl(kind)).ok_or_else(|| {
            AuthError::Configuration(format!("{kind:?} token expiry out of range"))
        })?;
        let claims = Claims {
            sub: user_id.to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            azp: self.authorized_party.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Issue a single token. Refresh tokens are persisted by fingerprint.
    pub async fn issue(&self, user_id: UserId, kind: TokenKind) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        let issued = self.sign(user_id, kind, now)?;
        if kind == TokenKind::Refresh {
            self.persist(user_id, &issued, None, now).await?;
        }
        Ok(issued)
    }

    /// Issue an access + refresh pair backed by one record, so that
    /// blacklisting the record revokes both.
    pub async fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let access = self.sign(user_id, TokenKind::Access, now)?;
        let refresh = self.sign(user_id, TokenKind::Refresh, now)?;
        let access_fingerprint = self.fingerprint(&access.token);
        self.persist(user_id, &refresh, Some(access_fingerprint), now)
            .await?;

        tracing::debug!(user_id = %user_id, "Issued token pair");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            access_token_expired_after: access.expires_at.timestamp_millis(),
            refresh_token_expired_after: refresh.expires_at.timestamp_millis(),
        })
    }

    async fn persist(
        &self,
        user_id: UserId,
        refresh: &IssuedToken,
        access_fingerprint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.repo
            .create(CreateToken {
                id: Uuid::new_v4(),
                user_id: user_id.0,
                fingerprint: self.fingerprint(&refresh.token),
                access_fingerprint,
                issued_at: now,
                expires_at: refresh.expires_at,
            })
            .await?;
        Ok(())
    }

    /// Cryptographic checks only: signature, audience, issuer, authorized
    /// party and token type.
    pub fn decode(&self, raw_token: &str, kind: TokenKind) -> Result<Claims, InvalidTokenReason> {
        let token = strip_bearer(raw_token);
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(kind = %kind, "Token rejected: {}", e);
            InvalidTokenReason::CannotBeDecrypted
        })?;
        let claims = data.claims;

        if !constant_time_str_eq(&claims.azp, &self.authorized_party) {
            tracing::debug!(kind = %kind, "Token rejected: authorized party mismatch");
            return Err(InvalidTokenReason::CannotBeDecrypted);
        }
        if claims.typ != kind {
            tracing::debug!(kind = %kind, presented = %claims.typ, "Token rejected: wrong type");
            return Err(InvalidTokenReason::CannotBeDecrypted);
        }
        Ok(claims)
    }

    /// Full verification. Storage failures are errors; every rejection is
    /// a [`TokenStatus::Invalid`].
    pub async fn validate(&self, raw_token: &str, kind: TokenKind) -> Result<TokenStatus, AuthError> {
        let claims = match self.decode(raw_token, kind) {
            Ok(claims) => claims,
            Err(reason) => return Ok(TokenStatus::Invalid(reason)),
        };
        let Ok(user_id) = UserId::parse(&claims.sub) else {
            return Ok(TokenStatus::Invalid(InvalidTokenReason::CannotBeDecrypted));
        };

        let record = self
            .repo
            .find_by_fingerprint(&self.fingerprint(raw_token))
            .await?;

        if record.as_ref().is_some_and(|r| r.blacklisted) {
            return Ok(TokenStatus::Invalid(InvalidTokenReason::Blacklisted));
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Ok(TokenStatus::Invalid(InvalidTokenReason::Expired));
        }
        if record.is_none() && kind == TokenKind::Refresh {
            return Ok(TokenStatus::Invalid(InvalidTokenReason::NotFound));
        }

        Ok(TokenStatus::Valid { user_id })
    }

    /// [`validate`](Self::validate), with rejections as [`AuthError::InvalidToken`]
    pub async fn require_valid(&self, raw_token: &str, kind: TokenKind) -> Result<UserId, AuthError> {
        match self.validate(raw_token, kind).await? {
            TokenStatus::Valid { user_id } => Ok(user_id),
            TokenStatus::Invalid(reason) => Err(AuthError::invalid_token(kind, reason)),
        }
    }

    /// Blacklist whatever record carries this fingerprint. Idempotent.
    pub async fn blacklist_fingerprint(&self, fingerprint: &str) -> Result<u64, AuthError> {
        Ok(self.repo.blacklist_by_fingerprint(fingerprint).await?)
    }

    /// Blacklist a record by ID. Idempotent.
    pub async fn blacklist_record(&self, id: Uuid) -> Result<u64, AuthError> {
        Ok(self.repo.blacklist(id).await?)
    }

    /// Blacklist a presented token after checking its signature.
    ///
    /// A refresh token with no record is reported as not found; access
    /// tokens are only stored by reference, so a miss is not an error.
    pub async fn revoke(&self, raw_token: &str, kind: TokenKind) -> Result<(), AuthError> {
        self.decode(raw_token, kind)
            .map_err(|reason| AuthError::invalid_token(kind, reason))?;
        let touched = self
            .blacklist_fingerprint(&self.fingerprint(raw_token))
            .await?;
        if touched == 0 && kind == TokenKind::Refresh {
            return Err(AuthError::invalid_token(kind, InvalidTokenReason::NotFound));
        }
        Ok(())
    }
}
