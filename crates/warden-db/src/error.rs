//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A unique column already holds this value
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    /// A stored value could not be mapped to a domain type
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Map a unique-index violation on `users` to [`DbError::Duplicate`].
pub(crate) fn classify_user_insert(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = match db.constraint() {
                Some(c) if c.contains("username") => "username",
                _ => "email",
            };
            return DbError::Duplicate(field);
        }
    }
    DbError::Sqlx(err)
}

/// Result type alias for database operations
pub type DbResult<T> = Result<T, DbError>;
