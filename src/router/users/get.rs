//! Current-user view and public channel profiles.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};

use crate::channel::{self, ChannelProfile};
use crate::user::User;
use crate::{AppState, ServerError};

/// Public view of the authenticated user.
pub async fn me(
    Extension(user): Extension<User>,
) -> Result<Json<User>, ServerError> {
    Ok(Json(user))
}

/// Channel profile by username, enriched with subscriber statistics.
///
/// Anonymous access is allowed; a valid bearer token only sets the viewer
/// for the `isSubscribed` flag.
pub async fn channel(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ChannelProfile>, ServerError> {
    let viewer = super::bearer_claims(&state, &headers).map(|claims| claims.sub);

    let profile =
        channel::profile(&state.db.postgres, &username, viewer.as_deref())
            .await?;

    Ok(Json(profile))
}
