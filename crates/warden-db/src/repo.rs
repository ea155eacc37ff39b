//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// User directory
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Find a user by (lowercased) email
    async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRow>>;

    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRow>>;

    /// Create a new user. A taken email or username yields
    /// [`DbError::Duplicate`](crate::DbError::Duplicate).
    async fn create(&self, user: CreateUser) -> DbResult<UserRow>;
}

/// Create user input. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub role: String,
    pub avatar: String,
}

/// Token record store
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a new record
    async fn create(&self, token: CreateToken) -> DbResult<TokenRow>;

    /// Find the record whose refresh or access fingerprint equals `fingerprint`
    async fn find_by_fingerprint(&self, fingerprint: &str) -> DbResult<Option<TokenRow>>;

    /// Blacklist the record matching `fingerprint` in either column.
    /// Returns the number of records touched.
    async fn blacklist_by_fingerprint(&self, fingerprint: &str) -> DbResult<u64>;

    /// Blacklist a record by ID
    async fn blacklist(&self, id: Uuid) -> DbResult<u64>;

    /// Delete records whose expiry is at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64>;
}

/// Create token input
#[derive(Debug, Clone)]
pub struct CreateToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fingerprint: String,
    pub access_fingerprint: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
