//! Watch-history aggregation.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};

/// Minimal owner projection attached to each watched video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerView {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

/// One entry of the enriched watch history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration_secs: i32,
    pub views: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub owner: OwnerView,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    title: String,
    thumbnail: Option<String>,
    duration_secs: i32,
    views: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    owner_username: String,
    owner_full_name: Option<String>,
    owner_avatar: Option<String>,
}

impl From<HistoryRow> for VideoView {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            thumbnail: row.thumbnail,
            duration_secs: row.duration_secs,
            views: row.views,
            created_at: row.created_at,
            owner: OwnerView {
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar: row.owner_avatar,
            },
        }
    }
}

/// Resolve a user's watch history into enriched video records.
///
/// Order and duplicates of the stored sequence are preserved; ids whose
/// video no longer exists are dropped. Fails [`ServerError::NotFound`]
/// only when the user itself does not resolve — an empty history is an
/// empty vector.
pub async fn watch_history(
    pool: &Pool<Postgres>,
    user_id: &str,
) -> Result<Vec<VideoView>> {
    let history: Option<Vec<String>> =
        sqlx::query_scalar("SELECT watch_history FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    let Some(history) = history else {
        return Err(ServerError::NotFound("user"));
    };

    if history.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"SELECT
            v.id,
            v.title,
            v.thumbnail,
            v.duration_secs,
            v.views,
            v.created_at,
            o.username AS owner_username,
            o.full_name AS owner_full_name,
            o.avatar AS owner_avatar
        FROM UNNEST($1::text[]) WITH ORDINALITY AS h(video_id, ord)
        JOIN videos v ON v.id = h.video_id
        JOIN users o ON o.id = v.owner_id
        ORDER BY h.ord"#,
    )
    .bind(&history)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VideoView::from).collect())
}

#[cfg(test)]
mod tests {
    use sqlx::{Pool, Postgres};

    use super::*;

    #[sqlx::test(fixtures("../fixtures/users.sql", "../fixtures/graph.sql"))]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_history_preserves_order_and_duplicates(
        pool: Pool<Postgres>,
    ) {
        // Fixture history: rust-intro, axum-deep-dive, rust-intro again.
        let history = watch_history(&pool, "admin").await.unwrap();

        let ids: Vec<&str> = history.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["rust-intro", "axum-deep-dive", "rust-intro"]);
        assert_eq!(history[0].owner.username, "channel");
    }

    #[sqlx::test(fixtures("../fixtures/users.sql"))]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_empty_history_is_not_an_error(pool: Pool<Postgres>) {
        let history = watch_history(&pool, "admin").await.unwrap();
        assert!(history.is_empty());
    }

    #[sqlx::test]
    #[ignore = "needs a running PostgreSQL instance"]
    async fn test_unknown_user_fails(pool: Pool<Postgres>) {
        assert!(matches!(
            watch_history(&pool, "ghost").await,
            Err(ServerError::NotFound(_))
        ));
    }
}
