//! Refresh-token session lifecycle.
//!
//! Each user holds at most one valid refresh token, persisted in the
//! `refresh_token` column. Rotation replaces it with a conditional
//! single-statement `UPDATE` so two concurrent rotations presenting the
//! same token can never both succeed.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::token::TokenManager;

/// Freshly minted access/refresh token pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Persisted refresh-token state, one scalar per user.
///
/// Every write touches only the `refresh_token` column: no unrelated field
/// validation can fail it, and a cancelled call leaves the stored value
/// exactly as before.
#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Postgres>,
}

impl SessionStore {
    /// Create a new [`SessionStore`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Overwrite the stored refresh token, whatever its prior value.
    pub async fn set(&self, user_id: &str, token: &str) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Current refresh token of a user, if a session is open.
    pub async fn get(&self, user_id: &str) -> Result<Option<String>> {
        let token: Option<Option<String>> = sqlx::query_scalar(
            "SELECT refresh_token FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token.flatten())
    }

    /// Terminate the session.
    pub async fn clear(&self, user_id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Terminate the session, but only if the stored token still equals
    /// `expected`. A session reopened in the meantime is left alone.
    pub async fn clear_if_matches(
        &self,
        user_id: &str,
        expected: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET refresh_token = NULL WHERE id = $1 AND refresh_token = $2",
        )
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically replace the stored token, but only if it still equals
    /// `expected`. Returns whether the swap happened.
    pub async fn replace_if_matches(
        &self,
        user_id: &str,
        expected: &str,
        new: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(user_id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Token lifecycle: `NoSession -> Active` on login, `Active -> Active` on
/// rotation, `Active -> NoSession` on logout or detected token reuse.
#[derive(Clone)]
pub struct SessionManager {
    tokens: TokenManager,
    store: SessionStore,
}

impl SessionManager {
    /// Create a new [`SessionManager`].
    pub fn new(tokens: TokenManager, store: SessionStore) -> Self {
        Self { tokens, store }
    }

    fn mint(&self, user_id: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.tokens.create_access(user_id)?,
            refresh_token: self.tokens.create_refresh(user_id)?,
        })
    }

    /// Open a session, overwriting any previous one.
    pub async fn open(&self, user_id: &str) -> Result<TokenPair> {
        let pair = self.mint(user_id)?;
        self.store.set(user_id, &pair.refresh_token).await?;

        Ok(pair)
    }

    /// Exchange a refresh token for a fresh pair, invalidating it.
    ///
    /// The presented token must carry a valid signature and expiry, and
    /// must still be the stored one. A valid but stale token means it was
    /// already rotated: the session is terminated, as the old token may
    /// have leaked.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair> {
        if presented.is_empty() {
            return Err(ServerError::Unauthorized);
        }

        let claims = self.tokens.decode_refresh(presented)?;
        let pair = self.mint(&claims.sub)?;

        if self
            .store
            .replace_if_matches(&claims.sub, presented, &pair.refresh_token)
            .await?
        {
            return Ok(pair);
        }

        match self.store.get(&claims.sub).await? {
            None => Err(ServerError::Unauthorized),
            Some(current) => {
                self.store.clear_if_matches(&claims.sub, &current).await?;
                Err(ServerError::TokenMismatch)
            },
        }
    }

    /// Close the session, if any.
    pub async fn close(&self, user_id: &str) -> Result<()> {
        self.store.clear(user_id).await
    }
}
