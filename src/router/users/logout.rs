//! Close the current session.

use axum::Extension;
use axum::extract::State;

use crate::user::User;
use crate::{AppState, ServerError};

pub async fn handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<(), ServerError> {
    state.sessions.close(&user.id).await?;

    tracing::info!(user_id = %user.id, "session closed");
    Ok(())
}
