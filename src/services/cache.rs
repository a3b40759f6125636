//! Read-through query cache for snippet and tag listings.
//!
//! Entries are keyed by `(ResourceKind, user_id, filter_hash)`. Invalidation
//! is explicit: mutations call [`QueryCache::invalidate`] directly, and the
//! change-feed listener calls it again for changes made elsewhere.
//!
//! The cache is bounded: each user key holds at most
//! [`DEFAULT_MAX_ENTRIES_PER_USER`] entries and the whole cache at most
//! [`DEFAULT_MAX_ENTRIES`]. Past either bound the oldest insert is evicted.
//!
//! Each user has a generation counter that every invalidation of that user
//! bumps, on top of a global epoch bumped by cross-user invalidations. A read
//! captures the generation before querying the store and only inserts its
//! result if the generation is unchanged, so a slow read cannot repopulate an
//! entry that a concurrent write has already invalidated.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Snippet, Tag};

/// Cache key used for requests without a user.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Entries kept per user key, all kinds together.
pub const DEFAULT_MAX_ENTRIES_PER_USER: usize = 32;

/// Entries kept across all users.
pub const DEFAULT_MAX_ENTRIES: usize = 2048;

/// Kind of cached listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The user's own snippets.
    Owned,
    /// Public snippets as seen by the user.
    Public,
    /// The user's tags.
    Tags,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [Self::Owned, Self::Public, Self::Tags];
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub user_id: String,
    pub filter_hash: String,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, user_id: Option<&str>, filter_hash: impl Into<String>) -> Self {
        Self {
            kind,
            user_id: user_id.unwrap_or(ANONYMOUS_KEY).to_string(),
            filter_hash: filter_hash.into(),
        }
    }
}

/// A cached listing.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Snippets(Arc<Vec<Snippet>>),
    Tags(Arc<Vec<Tag>>),
}

struct Entry {
    /// Insertion order, used for eviction.
    seq: u64,
    value: CachedValue,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, Entry>,
    generations: HashMap<String, u64>,
    epoch: u64,
    next_seq: u64,
}

impl CacheInner {
    /// Both counters only grow, so the sum changes whenever either does.
    fn generation(&self, user_key: &str) -> u64 {
        self.epoch + self.generations.get(user_key).copied().unwrap_or(0)
    }

    /// Remove the oldest entry among those matching `pred`.
    fn evict_oldest(&mut self, pred: impl Fn(&CacheKey) -> bool) {
        let oldest = self
            .entries
            .iter()
            .filter(|(k, _)| pred(k))
            .min_by_key(|(_, e)| e.seq)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            debug!(user = %key.user_id, kind = ?key.kind, "Evicting cache entry");
            self.entries.remove(&key);
        }
    }
}

/// Shared query cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<RwLock<CacheInner>>,
    max_per_user: usize,
    max_entries: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES_PER_USER, DEFAULT_MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache with explicit bounds. Zero bounds are raised to one.
    pub fn with_limits(max_per_user: usize, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            max_per_user: max_per_user.max(1),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.inner
            .read()
            .await
            .entries
            .get(key)
            .map(|e| e.value.clone())
    }

    /// Current generation for a user key.
    pub async fn generation(&self, user_key: &str) -> u64 {
        self.inner.read().await.generation(user_key)
    }

    /// Insert unless the user's entries were invalidated since `generation`
    /// was read. Returns whether the value was stored.
    pub async fn insert_if_current(&self, key: CacheKey, generation: u64, value: CachedValue) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation(&key.user_id) != generation {
            debug!(user = %key.user_id, kind = ?key.kind, "Skipping stale cache insert");
            return false;
        }

        if !inner.entries.contains_key(&key) {
            let user_entries = inner
                .entries
                .keys()
                .filter(|k| k.user_id == key.user_id)
                .count();
            if user_entries >= self.max_per_user {
                let user_id = key.user_id.clone();
                inner.evict_oldest(|k| k.user_id == user_id);
            }
            if inner.entries.len() >= self.max_entries {
                inner.evict_oldest(|_| true);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, Entry { seq, value });
        true
    }

    /// Drop every entry of the given kinds for one user.
    pub async fn invalidate(&self, user_id: Option<&str>, kinds: &[ResourceKind]) {
        let user_key = user_id.unwrap_or(ANONYMOUS_KEY);
        let mut inner = self.inner.write().await;
        inner
            .entries
            .retain(|k, _| !(k.user_id == user_key && kinds.contains(&k.kind)));
        *inner.generations.entry(user_key.to_string()).or_insert(0) += 1;
        debug!(user = %user_key, ?kinds, "Cache invalidated");
    }

    /// Drop every entry of one kind, for all users.
    pub async fn invalidate_kind(&self, kind: ResourceKind) {
        let mut inner = self.inner.write().await;
        inner.entries.retain(|k, _| k.kind != kind);
        // Readers still in flight for any user must not repopulate this kind.
        inner.epoch += 1;
        debug!(?kind, "Cache invalidated for all users");
    }

    /// Drop everything.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.epoch += 1;
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
