//! User profile queries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{now_timestamp, DbPool};
use crate::{Error, Result};

/// Profile record. `id` is the identity provider's user id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating or replacing a profile.
#[derive(Debug, Clone)]
pub struct UpsertProfile {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Whether a username is already claimed by anyone.
pub async fn username_exists(pool: &DbPool, username: &str) -> Result<bool> {
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM profiles WHERE username = ? LIMIT 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Get a profile by user id.
pub async fn get_profile(pool: &DbPool, id: &str) -> Result<Profile> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Profile not found: {}", id)))
}

/// Create or replace a profile.
pub async fn upsert_profile(pool: &DbPool, input: UpsertProfile) -> Result<Profile> {
    let now = now_timestamp();
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, username, full_name, avatar_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            full_name = excluded.full_name,
            avatar_url = excluded.avatar_url,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.username)
    .bind(&input.full_name)
    .bind(&input.avatar_url)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::Conflict("This username is already taken.".to_string())
        }
        _ => Error::Database(e),
    })
}
