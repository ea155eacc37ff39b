//! Auth errors

use thiserror::Error;
use warden_types::{InvalidTokenReason, TokenKind, ValidationErrors};

/// Authentication errors.
///
/// Display strings of domain variants are the exact messages clients see in
/// reply `errors`.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Sign-up with an email that already has an account
    #[error("Email is already occupied")]
    EmailOccupied,

    /// Sign-up with a username that already has an account
    #[error("Username is already occupied")]
    UsernameOccupied,

    /// Unknown identifier or wrong password; deliberately indistinguishable
    #[error("Invalid email, username, or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Presented token was rejected
    #[error("{}", .reason.message(.kind.clone()))]
    InvalidToken {
        kind: TokenKind,
        reason: InvalidTokenReason,
    },

    /// Payload failed boundary validation
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn invalid_token(kind: TokenKind, reason: InvalidTokenReason) -> Self {
        Self::InvalidToken { kind, reason }
    }

    /// Expected business rejections, as opposed to infrastructure failures
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_)
        )
    }

    /// Messages to place in a reply's `errors` list
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.messages(),
            other => vec![other.to_string()],
        }
    }

    /// Get error code for logs and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmailOccupied => "EMAIL_OCCUPIED",
            Self::UsernameOccupied => "USERNAME_OCCUPIED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidToken { reason, .. } => match reason {
                InvalidTokenReason::CannotBeDecrypted => "TOKEN_CANNOT_BE_DECRYPTED",
                InvalidTokenReason::Blacklisted => "TOKEN_BLACKLISTED",
                InvalidTokenReason::Expired => "TOKEN_EXPIRED",
                InvalidTokenReason::NotFound => "TOKEN_NOT_FOUND",
            },
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<warden_db::DbError> for AuthError {
    fn from(err: warden_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}
