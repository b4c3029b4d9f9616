//! Credential login.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::User;

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    /// Email or username, matched case-insensitively.
    #[validate(length(min = 2, max = 255))]
    identifier: String,
    #[validate(length(min = 8, max = 255))]
    password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: User,
}

/// Handler to log a user in and open their session.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let user = state
        .users
        .authenticate(&body.identifier, &body.password)
        .await?;
    let pair = state.sessions.open(&user.id).await?;

    tracing::info!(user_id = %user.id, "session opened");

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: crate::token::ACCESS_EXPIRATION_TIME,
        user,
    }))
}

#[cfg(test)]
pub(super) mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::router::create::tests::req_body;
    use crate::*;

    pub async fn login(
        app: Router,
        identifier: &str,
        password: &str,
    ) -> axum::http::Response<axum::body::Body> {
        let body = json!({ "identifier": identifier, "password": password });
        make_request(None, app, Method::POST, "/login", body.to_string()).await
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_login_handler(pool: Pool<Postgres>) {
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

        // Identifier matching is case-folded, email or username.
        for identifier in ["CHAI", "chai@vidhub.example.com"] {
            let response =
                login(app.clone(), identifier, "P$soW%920$n&").await;
            assert_eq!(response.status(), StatusCode::OK);

            let body =
                response.into_body().collect().await.unwrap().to_bytes();
            let body: Response = serde_json::from_slice(&body).unwrap();
            assert_eq!(body.token_type, TOKEN_TYPE);
            assert_eq!(body.user.username, "chai");

            // Both tokens decode to the same user id.
            let access =
                state.token.decode_access(&body.access_token).unwrap();
            let refresh =
                state.token.decode_refresh(&body.refresh_token).unwrap();
            assert_eq!(access.sub, "chai");
            assert_eq!(refresh.sub, "chai");
        }
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_login_wrong_password(pool: Pool<Postgres>) {
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

        let response = login(app, "chai", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_login_unknown_identifier(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let response = login(app, "nobody", "P$soW%920$n&").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
