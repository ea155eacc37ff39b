//! In-memory repositories
//!
//! Backed by `DashMap`. Used by tests and by single-process runs that do
//! not need durability. Uniqueness of email and username is enforced the
//! same way the PostgreSQL unique indexes do.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{TokenRow, UserRow};
use crate::repo::{CreateToken, CreateUser, TokenRepository, UserRepository};

/// In-memory user repository
#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    users: Arc<DashMap<Uuid, UserRow>>,
    by_email: Arc<DashMap<String, Uuid>>,
    by_username: Arc<DashMap<String, Uuid>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user, as an administrator deleting an account would
    pub fn remove_user(&self, id: Uuid) -> Option<UserRow> {
        let (_, row) = self.users.remove(&id)?;
        self.by_email.remove(&row.email);
        if let Some(ref username) = row.username {
            self.by_username.remove(username);
        }
        Some(row)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<UserRow>> {
        Ok(self
            .by_email
            .get(email)
            .and_then(|id| self.users.get(id.value()).map(|r| r.value().clone())))
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        Ok(self
            .by_username
            .get(username)
            .and_then(|id| self.users.get(id.value()).map(|r| r.value().clone())))
    }

    async fn create(&self, user: CreateUser) -> DbResult<UserRow> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(DbError::Duplicate("email")),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        if let Some(ref username) = user.username {
            let taken = match self.by_username.entry(username.clone()) {
                Entry::Occupied(_) => true,
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                    false
                }
            };
            if taken {
                self.by_email.remove(&user.email);
                return Err(DbError::Duplicate("username"));
            }
        }

        let now = Utc::now();
        let row = UserRow {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            avatar: user.avatar,
            role: user.role,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: None,
            email_confirmed: false,
            phone_confirmed: false,
            deactivated: false,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(row.id, row.clone());
        Ok(row)
    }
}

/// In-memory token repository
#[derive(Default, Clone)]
pub struct MemoryTokenRepository {
    tokens: Arc<DashMap<Uuid, TokenRow>>,
}

impl MemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Drop every record, as if all had been swept
    pub fn clear(&self) {
        self.tokens.clear();
    }

    /// Snapshot of every stored record
    pub fn all(&self) -> Vec<TokenRow> {
        self.tokens.iter().map(|r| r.value().clone()).collect()
    }

    fn matches(row: &TokenRow, fingerprint: &str) -> bool {
        row.fingerprint == fingerprint || row.access_fingerprint.as_deref() == Some(fingerprint)
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn create(&self, token: CreateToken) -> DbResult<TokenRow> {
        let row = TokenRow {
            id: token.id,
            user_id: token.user_id,
            fingerprint: token.fingerprint,
            access_fingerprint: token.access_fingerprint,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            blacklisted: false,
        };
        self.tokens.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> DbResult<Option<TokenRow>> {
        Ok(self
            .tokens
            .iter()
            .find(|r| Self::matches(r.value(), fingerprint))
            .map(|r| r.value().clone()))
    }

    async fn blacklist_by_fingerprint(&self, fingerprint: &str) -> DbResult<u64> {
        let mut touched = 0;
        for mut entry in self.tokens.iter_mut() {
            if Self::matches(entry.value(), fingerprint) {
                entry.value_mut().blacklisted = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn blacklist(&self, id: Uuid) -> DbResult<u64> {
        Ok(match self.tokens.get_mut(&id) {
            Some(mut row) => {
                row.blacklisted = true;
                1
            }
            None => 0,
        })
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, row| !row.is_expired_at(now));
        Ok((before - self.tokens.len()) as u64)
    }
}
