//! Snippet and tag entities.
//!
//! Rows come out of the store flat (one snippet row, plus one row per
//! snippet/tag association); [`Snippet::from_joined`] is the single place
//! where they become the entity the API returns.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Colour given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

/// A user-defined label attachable to snippets.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
}

/// Public author information joined from the profile relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
}

/// A stored unit of source code with its metadata and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_favorite: bool,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
    pub author: Option<Author>,
}

/// Flat snippet row, optionally carrying the joined author username.
#[derive(Debug, Clone, FromRow)]
pub struct SnippetRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub is_favorite: bool,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
    pub author_username: Option<String>,
}

/// One association row joined with its tag.
#[derive(Debug, Clone, FromRow)]
pub struct SnippetTagRow {
    pub snippet_id: String,
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
}

impl From<SnippetTagRow> for Tag {
    fn from(row: SnippetTagRow) -> Self {
        Tag {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            color: row.color,
        }
    }
}

impl Snippet {
    /// Build a snippet from its row and the association rows that belong to it.
    ///
    /// Association rows for other snippets are ignored, a snippet without any
    /// association gets an empty tag list, and a missing or blank author
    /// username yields `author: None`. Tags are ordered by name.
    pub fn from_joined(row: SnippetRow, tag_rows: &[SnippetTagRow]) -> Self {
        let mut tags: Vec<Tag> = tag_rows
            .iter()
            .filter(|t| t.snippet_id == row.id)
            .cloned()
            .map(Tag::from)
            .collect();
        tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let author = row
            .author_username
            .filter(|u| !u.trim().is_empty())
            .map(|username| Author { username });

        Snippet {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            code: row.code,
            language: row.language,
            is_favorite: row.is_favorite,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
            tags,
            author,
        }
    }

    /// Lowercased tag names, for case-insensitive comparisons.
    pub fn tag_names_lower(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.to_lowercase()).collect()
    }
}

/// Input for creating a snippet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSnippetInput {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// Names of existing tags to attach. Unknown names are dropped.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a snippet. `tags: Some(..)` replaces every association.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSnippetInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub color: Option<String>,
}
