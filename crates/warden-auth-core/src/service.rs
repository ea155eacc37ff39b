//! Auth service - sign-up, sign-in, refresh, authenticate and logout on top
//! of the token service and the user directory

use std::sync::Arc;

use uuid::Uuid;
use warden_db::{CreateUser, DbError, TokenRepository, UserRepository, UserRow};
use warden_types::{
    AuthSession, AuthenticateResponse, Identifier, LogoutRequest, LogoutResponse, Role,
    SignInRequest, SignUpRequest, TokenKind, User, UserId,
};

use crate::{
    clock::Clock, config::AuthConfig, password::PasswordHasher, token::TokenService, AuthError,
};

/// Authentication service
///
/// Provides the five operations served over the broker:
/// - Sign-up (implies sign-in)
/// - Sign-in by email or username
/// - Refresh of a token pair
/// - Authentication of an access token
/// - Logout (blacklisting)
pub struct AuthService<U: UserRepository, T: TokenRepository> {
    config: AuthConfig,
    tokens: TokenService<T>,
    passwords: PasswordHasher,
    user_repo: Arc<U>,
}

impl<U: UserRepository, T: TokenRepository> AuthService<U, T> {
    /// Create a new auth service
    pub fn new(config: AuthConfig, user_repo: Arc<U>, token_repo: Arc<T>) -> Result<Self, AuthError> {
        Ok(Self {
            tokens: TokenService::new(&config, token_repo)?,
            passwords: PasswordHasher::new(config.bcrypt_cost),
            user_repo,
            config,
        })
    }

    /// Replace the clock used for issuing and expiring tokens
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn tokens(&self) -> &TokenService<T> {
        &self.tokens
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    // =========================================================================
    // Sign-up / Sign-in
    // =========================================================================

    /// Create an account and sign straight into it
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<AuthSession, AuthError> {
        let email = req.email.trim().to_lowercase();

        if self.user_repo.find_by_email(&email).await?.is_some() {
            tracing::debug!("Sign-up rejected: email occupied");
            return Err(AuthError::EmailOccupied);
        }
        if self.config.check_username_uniqueness {
            if let Some(username) = &req.username {
                if self.user_repo.find_by_username(username).await?.is_some() {
                    tracing::debug!("Sign-up rejected: username occupied");
                    return Err(AuthError::UsernameOccupied);
                }
            }
        }

        let password_hash = self.passwords.hash(&req.password).await?;
        let create = CreateUser {
            id: Uuid::new_v4(),
            email: email.clone(),
            username: req.username.clone(),
            password_hash,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            role: Role::User.to_string(),
            avatar: String::new(),
        };

        // A concurrent sign-up may win the race past the checks above
        let row = self.user_repo.create(create).await.map_err(|e| match e {
            DbError::Duplicate("username") => AuthError::UsernameOccupied,
            DbError::Duplicate(_) => AuthError::EmailOccupied,
            other => AuthError::from(other),
        })?;
        tracing::info!(user_id = %row.id, "User created");

        self.sign_in(SignInRequest {
            email: Some(email),
            username: None,
            password: req.password,
        })
        .await
    }

    /// Exchange credentials for a token pair
    pub async fn sign_in(&self, req: SignInRequest) -> Result<AuthSession, AuthError> {
        let row = match req.identifier() {
            Some(Identifier::Email(email)) => {
                self.user_repo
                    .find_by_email(&email.trim().to_lowercase())
                    .await?
            }
            Some(Identifier::Username(username)) => {
                self.user_repo.find_by_username(username).await?
            }
            None => None,
        };

        let Some(row) = row else {
            // Same bcrypt work as a wrong password, so timing does not reveal the account
            self.passwords.verify_decoy(&req.password).await?;
            tracing::debug!("Sign-in rejected: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };
        if !self
            .passwords
            .verify(&req.password, &row.password_hash)
            .await?
        {
            tracing::debug!(user_id = %row.id, "Sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let user = to_user(&row)?;
        let tokens = self.tokens.issue_pair(user.id).await?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(AuthSession { user, tokens })
    }

    // =========================================================================
    // Token Operations
    // =========================================================================

    /// Issue a new pair for a valid refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let user_id = self
            .tokens
            .require_valid(refresh_token, TokenKind::Refresh)
            .await?;
        let user = self.get_user(user_id).await?;

        if self.config.rotate_refresh_tokens {
            self.tokens
                .blacklist_fingerprint(&self.tokens.fingerprint(refresh_token))
                .await?;
        }

        let tokens = self.tokens.issue_pair(user.id).await?;
        tracing::debug!(user_id = %user.id, "Tokens refreshed");
        Ok(AuthSession { user, tokens })
    }

    /// Resolve an access token to its (current) user
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticateResponse, AuthError> {
        let user_id = self
            .tokens
            .require_valid(access_token, TokenKind::Access)
            .await?;
        let user = self.get_user(user_id).await?;
        Ok(AuthenticateResponse { valid: true, user })
    }

    /// Blacklist the presented tokens
    pub async fn logout(&self, req: LogoutRequest) -> Result<LogoutResponse, AuthError> {
        self.tokens
            .revoke(&req.refresh_token, TokenKind::Refresh)
            .await?;
        if let Some(access_token) = &req.access_token {
            if let Err(e) = self.tokens.revoke(access_token, TokenKind::Access).await {
                if !e.is_domain() {
                    return Err(e);
                }
                tracing::debug!("Ignoring unusable access token on logout: {}", e);
            }
        }
        tracing::debug!("Logged out");
        Ok(LogoutResponse {})
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        let row = self
            .user_repo
            .find_by_id(user_id.0)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        to_user(&row)
    }
}

fn to_user(row: &UserRow) -> Result<User, AuthError> {
    Ok(row.to_user()?)
}
