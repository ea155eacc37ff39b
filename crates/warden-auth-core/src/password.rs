//! Password hashing
//!
//! bcrypt is CPU-bound, so both directions run on the blocking pool.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::AuthError;

/// Password hashed into the decoy used when an account does not exist
const DECOY_PASSWORD: &str = "warden-decoy-password";

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// A malformed stored hash counts as a mismatch
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?;
        Ok(matched.unwrap_or_else(|e| {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }))
    }

    /// Burn one verification at the configured cost and report a mismatch.
    ///
    /// Used when the account is unknown so that the reply takes as long as a
    /// wrong password would.
    pub async fn verify_decoy(&self, password: &str) -> Result<bool, AuthError> {
        let decoy = self
            .decoy
            .get_or_try_init(|| self.hash(DECOY_PASSWORD))
            .await?;
        self.verify(password, decoy).await?;
        Ok(false)
    }

    pub fn decoy_ready(&self) -> bool {
        self.decoy.initialized()
    }
}
