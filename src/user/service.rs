//! Account-level operations over the repository.

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::crypto::PasswordManager;
use crate::error::{Result, ServerError};
use crate::user::{NewUser, User, UserRepository};

/// User manager: registration and credential checks.
#[derive(Clone)]
pub struct UserService {
    pub repo: UserRepository,
    pwd: Arc<PasswordManager>,
}

impl UserService {
    /// Create a new [`UserService`].
    pub fn new(pool: Pool<Postgres>, pwd: Arc<PasswordManager>) -> Self {
        Self {
            repo: UserRepository::new(pool),
            pwd,
        }
    }

    /// Register a new account.
    ///
    /// Username and email are case-folded before storage so lookups stay
    /// case-insensitive; the password is stored as an Argon2id PHC string.
    pub async fn register(
        &self,
        profile: NewUser,
        password: &str,
    ) -> Result<User> {
        let username = profile.username.to_lowercase();
        let user = User {
            id: username.clone(),
            username,
            email: profile.email.to_lowercase(),
            full_name: profile.full_name,
            avatar: profile.avatar,
            cover_image: profile.cover_image,
            password: self.pwd.hash_password(password).map_err(|err| {
                ServerError::Internal {
                    details: "cannot hash password".into(),
                    source: Some(Box::new(err)),
                }
            })?,
            ..Default::default()
        };

        self.repo.insert(&user).await?;
        self.repo.find_by_id(&user.id).await
    }

    /// Check an identifier/password pair. No side effects.
    ///
    /// Fails [`ServerError::NotFound`] when no account matches the
    /// case-folded email or username, [`ServerError::InvalidCredential`]
    /// when the password does not verify.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<User> {
        let user = self.repo.find_by_identifier(identifier).await?;
        self.pwd.verify_password(password, &user.password)?;

        Ok(user)
    }

    /// Replace the password after verifying the current one.
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        self.pwd.verify_password(old_password, &user.password)?;

        let hash = self.pwd.hash_password(new_password).map_err(|err| {
            ServerError::Internal {
                details: "cannot hash password".into(),
                source: Some(Box::new(err)),
            }
        })?;
        self.repo.update_password(&user.id, &hash).await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::config::Argon2 as ArgonConfig;

    fn service(pool: Pool<Postgres>) -> UserService {
        let config = ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        };
        let pwd = Arc::new(PasswordManager::new(Some(config)).unwrap());
        UserService::new(pool, pwd)
    }

    fn profile() -> NewUser {
        NewUser {
            username: "Chai".into(),
            email: "Chai@vidhub.example.com".into(),
            full_name: Some("Chai Aur Code".into()),
            ..Default::default()
        }
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_register_then_authenticate(pool: Pool<Postgres>) {
        let users = service(pool);

        let created = users.register(profile(), "P$soW%920$n&").await.unwrap();
        assert_eq!(created.username, "chai");
        assert_eq!(created.email, "chai@vidhub.example.com");

        // Both identifiers resolve, whatever the case.
        for identifier in ["CHAI", "chai@Vidhub.example.COM"] {
            let user = users
                .authenticate(identifier, "P$soW%920$n&")
                .await
                .unwrap();
            assert_eq!(user.id, created.id);
        }

        assert!(matches!(
            users.authenticate("chai", "wrong-password").await,
            Err(ServerError::InvalidCredential)
        ));
        assert!(matches!(
            users.authenticate("nobody", "P$soW%920$n&").await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_duplicate_registration_conflicts(pool: Pool<Postgres>) {
        let users = service(pool);

        users.register(profile(), "P$soW%920$n&").await.unwrap();
        assert!(matches!(
            users.register(profile(), "P$soW%920$n&").await,
            Err(ServerError::Conflict { .. })
        ));
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_change_password(pool: Pool<Postgres>) {
        let users = service(pool);

        let user = users.register(profile(), "old-password").await.unwrap();

        assert!(matches!(
            users.change_password(&user, "bad-guess", "new-password").await,
            Err(ServerError::InvalidCredential)
        ));

        users
            .change_password(&user, "old-password", "new-password")
            .await
            .unwrap();
        users.authenticate("chai", "new-password").await.unwrap();
        assert!(matches!(
            users.authenticate("chai", "old-password").await,
            Err(ServerError::InvalidCredential)
        ));
    }
}
