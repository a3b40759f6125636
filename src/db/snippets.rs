//! Snippet and snippet/tag association queries.
//!
//! Functions taking `&mut SqliteConnection` are meant to run inside a
//! transaction opened by the caller; the rest take the pool.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::DbPool;
use crate::models::{SnippetFilters, SnippetRow, SnippetTagRow};
use crate::{Error, Result};

const SNIPPET_COLUMNS: &str = "s.id, s.user_id, s.title, s.description, s.code, s.language, \
     s.is_favorite, s.is_public, s.created_at, s.updated_at";

/// Which rows a listing may see.
#[derive(Debug, Clone)]
pub enum SnippetScope {
    /// Snippets owned by the user.
    Owned(String),
    /// Public snippets, excluding those owned by the given user.
    Public { exclude_user: Option<String> },
}

/// Input for inserting a snippet row.
#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_public: bool,
    pub created_at: String,
}

/// Full replacement of the mutable snippet columns.
#[derive(Debug, Clone)]
pub struct SnippetChanges {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_public: bool,
    pub updated_at: String,
}

fn push_select(qb: &mut QueryBuilder<'_, Sqlite>, with_author: bool) {
    qb.push("SELECT ");
    qb.push(SNIPPET_COLUMNS);
    if with_author {
        qb.push(", p.username AS author_username FROM snippets s LEFT JOIN profiles p ON p.id = s.user_id");
    } else {
        qb.push(", NULL AS author_username FROM snippets s");
    }
}

/// List snippet rows matching the scope and the server-side part of the filters.
///
/// Tag filters are not applied here, and the substring filter is only an ASCII
/// prefilter. Rows are ordered newest first.
pub async fn list_snippets(
    pool: &DbPool,
    scope: &SnippetScope,
    filters: &SnippetFilters,
    with_author: bool,
) -> Result<Vec<SnippetRow>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("");
    push_select(&mut qb, with_author);

    match scope {
        SnippetScope::Owned(user_id) => {
            qb.push(" WHERE s.user_id = ").push_bind(user_id.clone());
        }
        SnippetScope::Public { exclude_user } => {
            qb.push(" WHERE s.is_public = 1");
            if let Some(user_id) = exclude_user {
                qb.push(" AND s.user_id != ").push_bind(user_id.clone());
            }
        }
    }

    if let Some(pattern) = filters.like_pattern() {
        qb.push(" AND (s.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR s.description LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR s.code LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(language) = &filters.language {
        qb.push(" AND s.language = ").push_bind(language.clone());
    }

    if let Some(visibility) = filters.visibility {
        qb.push(" AND s.is_public = ").push_bind(visibility.is_public());
    }

    if let Some(favorite) = filters.favorite {
        qb.push(" AND s.is_favorite = ").push_bind(favorite);
    }

    qb.push(" ORDER BY s.created_at DESC, s.rowid DESC");

    let rows = qb.build_query_as::<SnippetRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Fetch one snippet row with its author.
pub async fn get_snippet_row(pool: &DbPool, id: &str) -> Result<SnippetRow> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("");
    push_select(&mut qb, true);
    qb.push(" WHERE s.id = ").push_bind(id.to_string());

    qb.build_query_as::<SnippetRow>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Snippet not found: {}", id)))
}

/// Fetch a snippet row only if the user owns it.
pub async fn get_owned_snippet_row(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
) -> Result<SnippetRow> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("");
    push_select(&mut qb, false);
    qb.push(" WHERE s.id = ")
        .push_bind(id.to_string())
        .push(" AND s.user_id = ")
        .push_bind(user_id.to_string());

    qb.build_query_as::<SnippetRow>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Snippet not found: {}", id)))
}

/// Association rows, joined with their tags, for the given snippets.
pub async fn tags_for_snippets(pool: &DbPool, snippet_ids: &[String]) -> Result<Vec<SnippetTagRow>> {
    if snippet_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT st.snippet_id, t.id, t.user_id, t.name, t.color \
         FROM snippet_tags st JOIN tags t ON t.id = st.tag_id \
         WHERE st.snippet_id IN (",
    );
    let mut separated = qb.separated(", ");
    for id in snippet_ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(") ORDER BY t.name");

    let rows = qb.build_query_as::<SnippetTagRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Insert a snippet row.
pub async fn insert_snippet(conn: &mut SqliteConnection, input: &NewSnippet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO snippets (id, user_id, title, description, code, language, is_favorite, is_public, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&input.id)
    .bind(&input.user_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.code)
    .bind(&input.language)
    .bind(input.is_public)
    .bind(&input.created_at)
    .bind(&input.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite the mutable columns of an owned snippet.
pub async fn update_snippet_row(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
    changes: &SnippetChanges,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE snippets
        SET title = ?, description = ?, code = ?, language = ?, is_public = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(&changes.code)
    .bind(&changes.language)
    .bind(changes.is_public)
    .bind(&changes.updated_at)
    .bind(id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Snippet not found: {}", id)));
    }
    Ok(())
}

/// Set the favorite flag of an owned snippet.
pub async fn set_favorite(pool: &DbPool, id: &str, user_id: &str, value: bool) -> Result<()> {
    let result = sqlx::query("UPDATE snippets SET is_favorite = ? WHERE id = ? AND user_id = ?")
        .bind(value)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Snippet not found: {}", id)));
    }
    Ok(())
}

/// Delete an owned snippet. Association rows cascade.
pub async fn delete_snippet(pool: &DbPool, id: &str, user_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM snippets WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Snippet not found: {}", id)));
    }
    Ok(())
}

/// Resolve tag names to ids among the user's existing tags (exact match).
pub async fn resolve_tag_ids(
    conn: &mut SqliteConnection,
    user_id: &str,
    names: &[String],
) -> Result<Vec<String>> {
    let mut names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort_unstable();
    names.dedup();

    if names.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM tags WHERE user_id = ");
    qb.push_bind(user_id.to_string()).push(" AND name IN (");
    let mut separated = qb.separated(", ");
    for name in &names {
        separated.push_bind(name.to_string());
    }
    separated.push_unseparated(")");

    let ids: Vec<(String,)> = qb
        .build_query_as::<(String,)>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Link a snippet to already-resolved tag ids.
pub async fn insert_snippet_tags(
    conn: &mut SqliteConnection,
    snippet_id: &str,
    user_id: &str,
    tag_ids: &[String],
) -> Result<()> {
    for tag_id in tag_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO snippet_tags (snippet_id, tag_id, user_id) VALUES (?, ?, ?)",
        )
        .bind(snippet_id)
        .bind(tag_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Remove every association of a snippet.
pub async fn clear_snippet_tags(conn: &mut SqliteConnection, snippet_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM snippet_tags WHERE snippet_id = ?")
        .bind(snippet_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
