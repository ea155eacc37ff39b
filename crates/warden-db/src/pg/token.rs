//! PostgreSQL token repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::TokenRow;
use crate::repo::{CreateToken, TokenRepository};

/// PostgreSQL token repository
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    /// Create a new token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn create(&self, token: CreateToken) -> DbResult<TokenRow> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO tokens (id, user_id, fingerprint, access_fingerprint, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, fingerprint, access_fingerprint,
                      issued_at, expires_at, blacklisted
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.fingerprint)
        .bind(&token.access_fingerprint)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> DbResult<Option<TokenRow>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, user_id, fingerprint, access_fingerprint,
                   issued_at, expires_at, blacklisted
            FROM tokens
            WHERE fingerprint = $1 OR access_fingerprint = $1
            LIMIT 1
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn blacklist_by_fingerprint(&self, fingerprint: &str) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE tokens SET blacklisted = TRUE WHERE fingerprint = $1 OR access_fingerprint = $1",
        )
        .bind(fingerprint)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn blacklist(&self, id: Uuid) -> DbResult<u64> {
        let result = sqlx::query("UPDATE tokens SET blacklisted = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
