//! Channel profile aggregation over the subscription graph.

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::error::{Result, ServerError};

/// Aggregated public view of a channel, relative to an optional viewer.
///
/// Carries only public profile fields plus graph statistics; credential
/// and session columns are never selected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    /// Edges where this user is the channel.
    pub subscribers_count: i64,
    /// Edges where this user is the subscriber.
    pub subscribed_to_count: i64,
    /// Whether the viewer subscribes to this channel. Always false for
    /// anonymous viewers.
    pub is_subscribed: bool,
}

/// Compute the channel profile for `username`, as seen by `viewer_id`.
///
/// A point-in-time snapshot: one statement, no locking, safe to run
/// concurrently with subscription writers.
pub async fn profile(
    pool: &Pool<Postgres>,
    username: &str,
    viewer_id: Option<&str>,
) -> Result<ChannelProfile> {
    sqlx::query_as::<_, ChannelProfile>(
        r#"SELECT
            u.id,
            u.username,
            u.full_name,
            u.avatar,
            u.cover_image,
            (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id)
                AS subscribers_count,
            (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id)
                AS subscribed_to_count,
            EXISTS(
                SELECT 1 FROM subscriptions s
                WHERE s.channel_id = u.id AND s.subscriber_id = $2
            ) AS is_subscribed
        FROM users u
        WHERE u.username = $1"#,
    )
    .bind(username.to_lowercase())
    .bind(viewer_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServerError::NotFound("channel"))
}
