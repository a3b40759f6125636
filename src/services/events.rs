//! In-process change feed.
//!
//! Every mutation of a user-scoped relation emits a [`ChangeEvent`] on a
//! broadcast channel. The only subscriber in the server is the cache
//! invalidation listener started by [`spawn_invalidation_listener`].

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::{QueryCache, ResourceKind};

/// Channel capacity for change events.
const CHANNEL_CAPACITY: usize = 1024;

/// Relation a change happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Snippets,
    Tags,
    SnippetTags,
    Profiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    pub user_id: String,
    pub row_id: Option<String>,
    pub timestamp: String,
}

/// Broadcast sender for change events.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Emit an event. Dropped silently when nobody listens.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Emit a change for one row.
    pub fn changed(&self, table: Table, op: ChangeOp, user_id: &str, row_id: Option<&str>) {
        self.emit(ChangeEvent {
            table,
            op,
            user_id: user_id.to_string(),
            row_id: row_id.map(String::from),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }
}

/// Apply the invalidations implied by one event.
pub async fn apply_event(cache: &QueryCache, event: &ChangeEvent) {
    debug!(table = ?event.table, op = ?event.op, user = %event.user_id, "Change received");

    match event.table {
        Table::Snippets | Table::SnippetTags => {
            cache.invalidate(Some(&event.user_id), &ResourceKind::ALL).await;
            cache.invalidate_kind(ResourceKind::Public).await;
        }
        Table::Tags => {
            cache
                .invalidate(Some(&event.user_id), &[ResourceKind::Tags, ResourceKind::Owned])
                .await;
            // Deleting a tag cascades to the associations shown in public listings.
            if event.op == ChangeOp::Delete {
                cache.invalidate_kind(ResourceKind::Public).await;
            }
        }
        // Author names are embedded in public listings.
        Table::Profiles => cache.invalidate_kind(ResourceKind::Public).await,
    }
}

/// Start the background task that keeps the cache coherent with the feed.
pub fn spawn_invalidation_listener(feed: &ChangeFeed, cache: QueryCache) -> JoinHandle<()> {
    let mut receiver = feed.subscribe();

    tokio::spawn(async move {
        info!("Cache invalidation listener started");
        loop {
            match receiver.recv().await {
                Ok(event) => apply_event(&cache, &event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change feed lagged, clearing cache");
                    cache.clear().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        info!("Cache invalidation listener stopped");
    })
}
