//! Users-related HTTP API.
mod get;
mod history;
mod logout;
mod password;
pub mod refresh_token;

use axum::extract::{Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Router, middleware};

use crate::user::User;
use crate::{AppState, ServerError};

const BEARER: &str = "Bearer ";

/// Custom middleware for authentification.
///
/// Access tokens are stateless: the claims are trusted once the signature
/// and expiry check out, and the subject is resolved to a live account.
async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let user_id = match bearer_claims(&state, req.headers()) {
        Some(claims) => claims.sub,
        None => return Err(ServerError::Unauthorized),
    };

    let user = state.users.repo.find_by_id(&user_id).await?;
    req.extensions_mut().insert::<User>(user);

    Ok(next.run(req).await)
}

/// Decode the `Authorization` bearer access token, if any.
fn bearer_claims(
    state: &AppState,
    headers: &axum::http::HeaderMap,
) -> Option<crate::token::Claims> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER))
        .and_then(|token| state.token.decode_access(token).ok())
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        // `GET /users/@me` goes to `get::me`. Authorization required.
        .route("/@me", get(get::me))
        // `GET /users/@me/history` goes to `history`. Authorization required.
        .route("/@me/history", get(history::handler))
        // `POST /users/@me/logout` goes to `logout`. Authorization required.
        .route("/@me/logout", post(logout::handler))
        // `PATCH /users/@me/password` goes to `password`. Authorization required.
        .route("/@me/password", patch(password::handler))
        .route_layer(middleware::from_fn_with_state(state, auth))
        // `GET /users/:USERNAME` goes to `get::channel`. Public.
        .route("/{username}", get(get::channel))
}
