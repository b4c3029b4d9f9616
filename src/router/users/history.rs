//! Watch history of the authenticated user.

use axum::extract::State;
use axum::{Extension, Json};

use crate::history::{self, VideoView};
use crate::user::User;
use crate::{AppState, ServerError};

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<VideoView>>, ServerError> {
    let history = history::watch_history(&state.db.postgres, &user.id).await?;

    Ok(Json(history))
}
