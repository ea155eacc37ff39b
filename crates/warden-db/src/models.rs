//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use warden_types::{User, UserId};

use crate::error::DbError;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: Option<String>,
    pub password_hash: String,
    pub avatar: String,
    pub role: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub email_confirmed: bool,
    pub phone_confirmed: bool,
    pub deactivated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }

    /// Public view with the password hash stripped
    pub fn to_user(&self) -> Result<User, DbError> {
        let role = self
            .role
            .parse()
            .map_err(|e: warden_types::RoleParseError| DbError::InvalidData(e.to_string()))?;
        Ok(User {
            id: self.user_id(),
            username: self.username.clone(),
            avatar: self.avatar.clone(),
            role,
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            email_confirmed: self.email_confirmed,
            phone_confirmed: self.phone_confirmed,
            deactivated: self.deactivated,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Persisted token record. Holds fingerprints only, never raw tokens.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Fingerprint of the refresh token
    pub fingerprint: String,
    /// Fingerprint of the access token issued alongside it
    pub access_fingerprint: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
}

impl TokenRow {
    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
