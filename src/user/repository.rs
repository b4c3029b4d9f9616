//! Handle database requests.

use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};
use crate::user::User;

const USER_COLUMNS: &str = r#"id, username, email, full_name, avatar,
    cover_image, password, refresh_token, watch_history, created_at"#;

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`User`] into database.
    ///
    /// Fails with [`ServerError::Conflict`] if the username or email is
    /// already taken (unique indexes on both).
    pub async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, username, email, full_name, avatar, cover_image, password)
                VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .bind(&user.password)
        .execute(&self.pool)
        .await
        .map_err(|err| ServerError::conflict_on_unique(err, "user"))?;

        Ok(())
    }

    /// Find current user using `id` field.
    pub async fn find_by_id(&self, user_id: &str) -> Result<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound("user"))
    }

    /// Find current user using a case-folded email or username.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<User> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(identifier.to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServerError::NotFound("user"))
    }

    /// Replace the stored password hash.
    pub async fn update_password(
        &self,
        user_id: &str,
        phc_hash: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(user_id)
            .bind(phc_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
