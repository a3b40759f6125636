//! Tag queries. Tags are scoped to their owning user.

use super::{now_timestamp, DbPool};
use crate::models::Tag;
use crate::{Error, Result};

/// Input for inserting a tag.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
}

/// List the user's tags ordered by name.
pub async fn list_tags(pool: &DbPool, user_id: &str) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name, color FROM tags
        WHERE user_id = ?
        ORDER BY name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tags)
}

/// Insert a tag. No duplicate-name check is made.
pub async fn create_tag(pool: &DbPool, input: NewTag) -> Result<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (id, user_id, name, color, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, name, color
        "#,
    )
    .bind(&input.id)
    .bind(&input.user_id)
    .bind(&input.name)
    .bind(&input.color)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;

    Ok(tag)
}

/// Delete an owned tag. Its associations cascade.
pub async fn delete_tag(pool: &DbPool, id: &str, user_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Tag not found: {}", id)));
    }
    Ok(())
}
