//! Recently viewed videos, capped per user.

use sqlx::FromRow;

use super::{now_timestamp, DbPool};
use crate::models::Video;
use crate::Result;

/// How many entries are kept per user.
pub const RECENTLY_VIEWED_LIMIT: i64 = 10;

#[derive(Debug, Clone, FromRow)]
struct RecentlyViewedRow {
    video_id: String,
    title: String,
    thumbnail: String,
    channel: String,
    duration: String,
    views: String,
    likes: String,
    description: String,
}

impl From<RecentlyViewedRow> for Video {
    fn from(row: RecentlyViewedRow) -> Self {
        Video {
            id: row.video_id,
            title: row.title,
            thumbnail: row.thumbnail,
            channel: row.channel,
            duration: row.duration,
            views: row.views,
            likes: row.likes,
            description: row.description,
            category: Some("Recently Viewed".to_string()),
        }
    }
}

/// The user's recently viewed videos, newest first.
pub async fn list_recently_viewed(pool: &DbPool, user_id: &str) -> Result<Vec<Video>> {
    let rows = sqlx::query_as::<_, RecentlyViewedRow>(
        r#"
        SELECT video_id, title, thumbnail, channel, duration, views, likes, description
        FROM recently_viewed
        WHERE user_id = ?
        ORDER BY viewed_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(RECENTLY_VIEWED_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Video::from).collect())
}

/// Record a view: upsert the entry, then drop everything past the cap.
pub async fn record_view(pool: &DbPool, user_id: &str, video: &Video) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO recently_viewed
            (user_id, video_id, title, thumbnail, channel, duration, views, likes, description, viewed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, video_id) DO UPDATE SET
            title = excluded.title,
            thumbnail = excluded.thumbnail,
            channel = excluded.channel,
            duration = excluded.duration,
            views = excluded.views,
            likes = excluded.likes,
            description = excluded.description,
            viewed_at = excluded.viewed_at
        "#,
    )
    .bind(user_id)
    .bind(&video.id)
    .bind(&video.title)
    .bind(&video.thumbnail)
    .bind(&video.channel)
    .bind(&video.duration)
    .bind(&video.views)
    .bind(&video.likes)
    .bind(&video.description)
    .bind(now_timestamp())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM recently_viewed
        WHERE user_id = ? AND video_id NOT IN (
            SELECT video_id FROM recently_viewed
            WHERE user_id = ?
            ORDER BY viewed_at DESC, rowid DESC
            LIMIT ?
        )
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(RECENTLY_VIEWED_LIMIT)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove one entry. Returns whether anything was deleted.
pub async fn remove_recently_viewed(pool: &DbPool, user_id: &str, video_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM recently_viewed WHERE user_id = ? AND video_id = ?")
        .bind(user_id)
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
