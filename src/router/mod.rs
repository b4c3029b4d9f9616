//! HTTP routes.

pub mod create;
pub mod login;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::ServerError;

/// Extract a JSON body and run its `validator` rules before the handler
/// sees it.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        body.validate()?;

        Ok(Self(body))
    }
}

/// Usernames are also channel handles and URL path segments.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let re = regex_lite::Regex::new(r"^[A-Za-z0-9_]+$")
        .map_err(|_| ValidationError::new("invalid_username"))?;

    if !re.is_match(username) || username == "@me" {
        return Err(ValidationError::new("invalid_username"));
    }

    Ok(())
}

/// Build a test [`crate::AppState`] over an existing pool.
#[cfg(test)]
pub fn state(pool: sqlx::Pool<sqlx::Postgres>) -> crate::AppState {
    use std::sync::Arc;

    use crate::config::{Argon2, Configuration, Token};
    use crate::crypto::PasswordManager;
    use crate::session::{SessionManager, SessionStore};
    use crate::user::UserService;

    let mut config = Configuration::default();
    config.name = "vidhub".to_owned();
    config.url = "https://vidhub.example.com/".to_owned();
    config.token = Some(Token {
        access_secret: "test-access".to_owned(),
        refresh_secret: "test-refresh".to_owned(),
    });
    let config = Arc::new(config);
    let argon2 = Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    };
    let pwd = Arc::new(
        PasswordManager::new(Some(argon2)).expect("invalid argon2 params"),
    );
    let token = crate::token::TokenManager::new(
        &config.url,
        "test-access",
        "test-refresh",
    );

    crate::AppState {
        config,
        db: crate::database::Database {
            postgres: pool.clone(),
        },
        users: UserService::new(pool.clone(), pwd),
        sessions: SessionManager::new(token.clone(), SessionStore::new(pool)),
        token,
    }
}
