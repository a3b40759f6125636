//! Snippet access layer.
//!
//! Wraps the snippet queries with validation, the read-through cache and
//! change-feed publication. Writes that touch both snippets and their tag
//! associations run in a single transaction.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cache::{CacheKey, CachedValue, QueryCache, ResourceKind};
use super::events::{ChangeFeed, ChangeOp, Table};
use crate::db::{self, DbPool, NewSnippet, SnippetChanges, SnippetScope};
use crate::models::{
    CreateSnippetInput, Snippet, SnippetFilters, SnippetRow, UpdateSnippetInput,
};
use crate::{Error, Result};

/// Language stored when none is given.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

#[derive(Clone)]
pub struct SnippetService {
    db: DbPool,
    cache: QueryCache,
    feed: ChangeFeed,
}

impl SnippetService {
    pub fn new(db: DbPool, cache: QueryCache, feed: ChangeFeed) -> Self {
        Self { db, cache, feed }
    }

    /// The user's own snippets. Anonymous callers get an empty list.
    pub async fn list_owned(
        &self,
        user_id: Option<&str>,
        filters: SnippetFilters,
    ) -> Result<Vec<Snippet>> {
        let Some(user_id) = user_id else {
            return Ok(Vec::new());
        };
        let filters = filters.normalized();
        let key = CacheKey::new(ResourceKind::Owned, Some(user_id), filters.cache_hash());

        if let Some(CachedValue::Snippets(cached)) = self.cache.get(&key).await {
            debug!(user = %user_id, "Owned snippets served from cache");
            return Ok(cached.as_ref().clone());
        }

        let generation = self.cache.generation(&key.user_id).await;
        let scope = SnippetScope::Owned(user_id.to_string());
        let rows = db::list_snippets(&self.db, &scope, &filters, false).await?;
        let snippets = filters.retain_matching(self.hydrate(rows).await?);

        self.cache
            .insert_if_current(key, generation, CachedValue::Snippets(Arc::new(snippets.clone())))
            .await;
        Ok(snippets)
    }

    /// Public snippets from other users, with author usernames.
    pub async fn list_public(
        &self,
        user_id: Option<&str>,
        filters: SnippetFilters,
    ) -> Result<Vec<Snippet>> {
        let filters = filters.normalized();
        let key = CacheKey::new(ResourceKind::Public, user_id, filters.cache_hash());

        if let Some(CachedValue::Snippets(cached)) = self.cache.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let generation = self.cache.generation(&key.user_id).await;
        let scope = SnippetScope::Public {
            exclude_user: user_id.map(String::from),
        };
        let rows = match db::list_snippets(&self.db, &scope, &filters, true).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Public listing with authors failed, retrying without profiles");
                db::list_snippets(&self.db, &scope, &filters, false).await?
            }
        };
        let snippets = filters.retain_matching(self.hydrate(rows).await?);

        self.cache
            .insert_if_current(key, generation, CachedValue::Snippets(Arc::new(snippets.clone())))
            .await;
        Ok(snippets)
    }

    /// A single snippet. Owners see their own; others only public ones.
    pub async fn get(&self, user_id: Option<&str>, id: &str) -> Result<Snippet> {
        let row = db::get_snippet_row(&self.db, id).await?;
        if !row.is_public && Some(row.user_id.as_str()) != user_id {
            return Err(Error::NotFound(format!("Snippet not found: {}", id)));
        }
        self.hydrate_one(row).await
    }

    pub async fn create(&self, user_id: &str, input: CreateSnippetInput) -> Result<Snippet> {
        let title = required_title(&input.title)?;
        let code = required_code(&input.code)?;

        let new = NewSnippet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            description: clean_description(input.description),
            code,
            language: clean_language(input.language),
            is_public: input.is_public,
            created_at: db::now_timestamp(),
        };

        let mut tx = self.db.begin().await?;
        db::insert_snippet(&mut *tx, &new).await?;
        let tag_ids = db::resolve_tag_ids(&mut *tx, user_id, &input.tags).await?;
        db::insert_snippet_tags(&mut *tx, &new.id, user_id, &tag_ids).await?;
        tx.commit().await?;

        info!(snippet_id = %new.id, user = %user_id, tags = tag_ids.len(), "Snippet created");

        self.after_write(user_id, ChangeOp::Insert, &new.id, !tag_ids.is_empty())
            .await;
        self.load(&new.id).await
    }

    /// Partial update. `tags: Some(..)` replaces every association.
    pub async fn update(&self, user_id: &str, id: &str, input: UpdateSnippetInput) -> Result<Snippet> {
        let mut tx = self.db.begin().await?;
        let current = db::get_owned_snippet_row(&mut *tx, id, user_id).await?;

        let changes = SnippetChanges {
            title: match &input.title {
                Some(title) => required_title(title)?,
                None => current.title,
            },
            description: match input.description {
                Some(description) => clean_description(Some(description)),
                None => current.description,
            },
            code: match &input.code {
                Some(code) => required_code(code)?,
                None => current.code,
            },
            language: match input.language {
                Some(language) => clean_language(Some(language)),
                None => current.language,
            },
            is_public: input.is_public.unwrap_or(current.is_public),
            updated_at: db::now_timestamp(),
        };
        db::update_snippet_row(&mut *tx, id, user_id, &changes).await?;

        let replaced_tags = match &input.tags {
            Some(names) => {
                db::clear_snippet_tags(&mut *tx, id).await?;
                let tag_ids = db::resolve_tag_ids(&mut *tx, user_id, names).await?;
                db::insert_snippet_tags(&mut *tx, id, user_id, &tag_ids).await?;
                true
            }
            None => false,
        };
        tx.commit().await?;

        debug!(snippet_id = %id, replaced_tags, "Snippet updated");

        self.after_write(user_id, ChangeOp::Update, id, replaced_tags).await;
        self.load(id).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        db::delete_snippet(&self.db, id, user_id).await?;
        info!(snippet_id = %id, user = %user_id, "Snippet deleted");
        self.after_write(user_id, ChangeOp::Delete, id, false).await;
        Ok(())
    }

    pub async fn toggle_favorite(&self, user_id: &str, id: &str, value: bool) -> Result<Snippet> {
        db::set_favorite(&self.db, id, user_id, value).await?;
        self.after_write(user_id, ChangeOp::Update, id, false).await;
        self.load(id).await
    }

    async fn after_write(&self, user_id: &str, op: ChangeOp, id: &str, tags_touched: bool) {
        self.cache.invalidate(Some(user_id), &ResourceKind::ALL).await;
        self.feed.changed(Table::Snippets, op, user_id, Some(id));
        if tags_touched {
            self.feed.changed(Table::SnippetTags, op, user_id, Some(id));
        }
    }

    async fn load(&self, id: &str) -> Result<Snippet> {
        let row = db::get_snippet_row(&self.db, id).await?;
        self.hydrate_one(row).await
    }

    async fn hydrate_one(&self, row: SnippetRow) -> Result<Snippet> {
        let tag_rows = db::tags_for_snippets(&self.db, std::slice::from_ref(&row.id)).await?;
        Ok(Snippet::from_joined(row, &tag_rows))
    }

    async fn hydrate(&self, rows: Vec<SnippetRow>) -> Result<Vec<Snippet>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let tag_rows = db::tags_for_snippets(&self.db, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| Snippet::from_joined(row, &tag_rows))
            .collect())
    }
}

fn required_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

fn required_code(code: &str) -> Result<String> {
    if code.trim().is_empty() {
        return Err(Error::Validation("Code is required".to_string()));
    }
    Ok(code.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn clean_language(language: Option<String>) -> String {
    language
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
