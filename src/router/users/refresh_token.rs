//! Get a new token pair with a refresh token.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::router::Valid;
use crate::router::login::TOKEN_TYPE;
use crate::{AppState, ServerError};

fn validate_grant_type(grant_type: &str) -> Result<(), ValidationError> {
    // As specified on OAuth2.0 spec, reject if grant_type is not valid.
    if grant_type != "refresh_token" {
        return Err(ValidationError::new("invalid_grant_type"));
    }

    Ok(())
}

#[derive(Debug, Validate, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    refresh_token: String,
    #[validate(custom(
        function = validate_grant_type,
        message = "\"grant_type\" must be \"refresh_token\"."
    ))]
    grant_type: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Rotate the presented refresh token for a fresh pair.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>, ServerError> {
    let pair = state.sessions.rotate(&body.refresh_token).await?;

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: crate::token::ACCESS_EXPIRATION_TIME,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    use super::*;
    use crate::router::create::tests::req_body;
    use crate::router::login::tests::login;
    use crate::*;

    async fn refresh(
        app: Router,
        token: &str,
    ) -> axum::http::Response<axum::body::Body> {
        let body = json!({
            "refresh_token": token,
            "grant_type": "refresh_token",
        });
        make_request(None, app, Method::POST, "/oauth/token", body.to_string())
            .await
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_refresh_rotates_token(pool: Pool<Postgres>) {
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
        let response = login(app.clone(), "chai", "P$soW%920$n&").await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::login::Response =
            serde_json::from_slice(&body).unwrap();

        let response = refresh(app.clone(), &body.refresh_token).await;
        assert_eq!(response.status(), StatusCode::OK);

        let fresh = response.into_body().collect().await.unwrap().to_bytes();
        let fresh: Response = serde_json::from_slice(&fresh).unwrap();
        assert_ne!(fresh.refresh_token, body.refresh_token);
        assert_eq!(
            state.token.decode_refresh(&fresh.refresh_token).unwrap().sub,
            "chai"
        );

        // The replaced token is now stale.
        let response = refresh(app, &body.refresh_token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_refresh_rejects_missing_token(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let body = json!({ "grant_type": "refresh_token" });
        let response = make_request(
            None,
            app,
            Method::POST,
            "/oauth/token",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_refresh_rejects_wrong_grant_type(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state.clone());

        let body = json!({
            "refresh_token": "whatever",
            "grant_type": "authorization_code",
        });
        let response = make_request(
            None,
            app,
            Method::POST,
            "/oauth/token",
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
