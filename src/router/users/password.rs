//! Change the account password.

use axum::Extension;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::router::Valid;
use crate::user::User;
use crate::{AppState, ServerError};

#[derive(Debug, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(length(min = 8, max = 255))]
    old_password: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    new_password: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<Body>,
) -> Result<(), ServerError> {
    state
        .users
        .change_password(&user, &body.old_password, &body.new_password)
        .await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use crate::router::create::tests::req_body;
    use crate::router::login::tests::login;
    use crate::*;

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_change_password(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        make_request(
            None,
            app.clone(),
            Method::POST,
            "/create",
            req_body("chai").to_string(),
        )
        .await;

        // Wrong current password.
        let body = json!({
            "oldPassword": "not-the-password",
            "newPassword": "N3w_P$ssW0rD!",
        });
        let response = make_request_as(
            &state,
            "chai",
            app.clone(),
            Method::PATCH,
            "/users/@me/password",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json!({
            "oldPassword": "P$soW%920$n&",
            "newPassword": "N3w_P$ssW0rD!",
        });
        let response = make_request_as(
            &state,
            "chai",
            app.clone(),
            Method::PATCH,
            "/users/@me/password",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = login(app.clone(), "chai", "P$soW%920$n&").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = login(app, "chai", "N3w_P$ssW0rD!").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
