//! Tag access layer.

use std::sync::Arc;

use tracing::info;

use super::cache::{CacheKey, CachedValue, QueryCache, ResourceKind};
use super::events::{ChangeFeed, ChangeOp, Table};
use crate::db::{self, DbPool, NewTag};
use crate::models::{CreateTagInput, Tag, DEFAULT_TAG_COLOR};
use crate::{Error, Result};

#[derive(Clone)]
pub struct TagService {
    db: DbPool,
    cache: QueryCache,
    feed: ChangeFeed,
}

impl TagService {
    pub fn new(db: DbPool, cache: QueryCache, feed: ChangeFeed) -> Self {
        Self { db, cache, feed }
    }

    /// The user's tags ordered by name. Anonymous callers get an empty list.
    pub async fn list(&self, user_id: Option<&str>) -> Result<Vec<Tag>> {
        let Some(user_id) = user_id else {
            return Ok(Vec::new());
        };
        let key = CacheKey::new(ResourceKind::Tags, Some(user_id), "all");
        if let Some(CachedValue::Tags(cached)) = self.cache.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let generation = self.cache.generation(user_id).await;
        let tags = db::list_tags(&self.db, user_id).await?;
        self.cache
            .insert_if_current(key, generation, CachedValue::Tags(Arc::new(tags.clone())))
            .await;
        Ok(tags)
    }

    pub async fn create(&self, user_id: &str, input: CreateTagInput) -> Result<Tag> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Tag name is required".to_string()));
        }
        let color = input
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());

        let tag = db::create_tag(
            &self.db,
            NewTag {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                color,
            },
        )
        .await?;

        info!(tag_id = %tag.id, name = %tag.name, "Tag created");
        self.after_write(user_id, ChangeOp::Insert, &tag.id).await;
        Ok(tag)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        db::delete_tag(&self.db, id, user_id).await?;
        self.after_write(user_id, ChangeOp::Delete, id).await;
        Ok(())
    }

    async fn after_write(&self, user_id: &str, op: ChangeOp, id: &str) {
        self.cache
            .invalidate(Some(user_id), &[ResourceKind::Tags, ResourceKind::Owned])
            .await;
        if op == ChangeOp::Delete {
            self.cache.invalidate_kind(ResourceKind::Public).await;
        }
        self.feed.changed(Table::Tags, op, user_id, Some(id));
    }
}
