//! Account registration.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{NewUser, User};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(
        length(min = 2, max = 30),
        custom(
            function = crate::router::validate_username,
            message = "Username must be alphanumeric."
        )
    )]
    pub username: String,
    #[validate(email(message = "Email must be formatted."))]
    email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    password: String,
    #[validate(length(min = 1, max = 100))]
    full_name: Option<String>,
    /// Reference to an already-uploaded avatar; the binary itself goes
    /// through the upload boundary, not this service.
    #[validate(url(message = "Avatar must be a URL."))]
    avatar: Option<String>,
    #[validate(url(message = "Cover image must be a URL."))]
    cover_image: Option<String>,
}

/// Handler to create user.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<User>)> {
    let profile = NewUser {
        username: body.username,
        email: body.email,
        full_name: body.full_name,
        avatar: body.avatar,
        cover_image: body.cover_image,
    };
    let user = state.users.register(profile, &body.password).await?;

    tracing::info!(user_id = %user.id, "account created");

    Ok((StatusCode::CREATED, Json(user)))
}
