//! Note queries. Notes are private to their owner.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{now_timestamp, DbPool};
use crate::{Error, Result};

/// Note record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub pdf_url: Option<String>,
    pub pdf_name: Option<String>,
    /// Object-storage key of the attached PDF; never sent to clients.
    #[serde(skip_serializing, default)]
    pub storage_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub pdf_url: Option<String>,
    pub pdf_name: Option<String>,
    pub storage_key: Option<String>,
}

/// List the user's notes, most recently updated first.
pub async fn list_notes(pool: &DbPool, user_id: &str) -> Result<Vec<Note>> {
    let notes = sqlx::query_as::<_, Note>(
        "SELECT * FROM notes WHERE user_id = ? ORDER BY updated_at DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(notes)
}

/// Get a note only if the user owns it.
pub async fn get_owned_note(pool: &DbPool, id: &str, user_id: &str) -> Result<Note> {
    sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Note not found: {}", id)))
}

/// Insert a note.
pub async fn create_note(pool: &DbPool, input: NewNote) -> Result<Note> {
    let now = now_timestamp();
    let note = sqlx::query_as::<_, Note>(
        r#"
        INSERT INTO notes (id, user_id, title, pdf_url, pdf_name, storage_key, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.user_id)
    .bind(&input.title)
    .bind(&input.pdf_url)
    .bind(&input.pdf_name)
    .bind(&input.storage_key)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;
    Ok(note)
}

/// Rename an owned note and bump its `updated_at`.
pub async fn rename_note(pool: &DbPool, id: &str, user_id: &str, title: &str) -> Result<Note> {
    sqlx::query_as::<_, Note>(
        r#"
        UPDATE notes SET title = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(now_timestamp())
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Note not found: {}", id)))
}

/// Delete an owned note, returning the removed record.
pub async fn delete_note(pool: &DbPool, id: &str, user_id: &str) -> Result<Note> {
    sqlx::query_as::<_, Note>("DELETE FROM notes WHERE id = ? AND user_id = ? RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Note not found: {}", id)))
}
