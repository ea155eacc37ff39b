//! Token kinds, token pairs and invalid-token reasons

use serde::{Deserialize, Serialize};

/// Which half of a token pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Access => "Access token",
            Self::Refresh => "Refresh token",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshly issued credentials. Expiries are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expired_after: i64,
    pub refresh_token_expired_after: i64,
}

/// Why a presented token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidTokenReason {
    CannotBeDecrypted,
    Blacklisted,
    Expired,
    NotFound,
}

impl InvalidTokenReason {
    /// Human-readable reason for a token of the given kind
    pub fn message(&self, kind: TokenKind) -> String {
        let suffix = match self {
            Self::CannotBeDecrypted => "cannot be decrypted",
            Self::Blacklisted => "is blacklisted",
            Self::Expired => "is expired",
            Self::NotFound => "not found",
        };
        format!("{} {}", kind.label(), suffix)
    }
}
