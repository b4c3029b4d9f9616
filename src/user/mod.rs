mod repository;
mod service;

pub use repository::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// User as saved on database.
///
/// Credential and session fields never leave the server: serialization
/// skips them, so handlers can return this struct as the public view.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    #[serde(skip)]
    pub watch_history: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Profile fields accepted at registration.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}
