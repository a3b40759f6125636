//! Application state for CodeVault.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;

use crate::config::{self, Config};
use crate::db::DbPool;
use crate::services::{
    spawn_invalidation_listener, ChangeFeed, CodeAnalyzer, GitHubService, IdentityClient,
    LocalObjectStorage, ObjectStorage, QueryCache, SnippetService, TagService, YouTubeService,
};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Database connection pool.
    pub db: DbPool,
    /// Read-through cache for snippet and tag listings.
    pub cache: QueryCache,
    /// In-process change feed.
    pub feed: ChangeFeed,
    pub snippets: SnippetService,
    pub tags: TagService,
    /// Gemini code analysis and tutor chat.
    pub analyzer: CodeAnalyzer,
    /// YouTube video search.
    pub youtube: YouTubeService,
    /// GitHub repository search.
    pub github: GitHubService,
    /// Identity provider admin client.
    pub identity: IdentityClient,
    /// Note attachment storage.
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Create the application state from the global configuration.
    pub async fn new() -> Result<Self> {
        Self::with_config(config::config().clone()).await
    }

    /// Create the application state from an explicit configuration.
    ///
    /// Opens the database, applies the schema and starts the cache
    /// invalidation listener.
    pub async fn with_config(config: Config) -> Result<Self> {
        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        let http = reqwest::Client::builder().build()?;

        let cache = QueryCache::new();
        let feed = ChangeFeed::new();
        spawn_invalidation_listener(&feed, cache.clone());

        let storage: Arc<dyn ObjectStorage> =
            Arc::new(LocalObjectStorage::new(&config.storage.attachments_path));

        Ok(Self {
            snippets: SnippetService::new(db.clone(), cache.clone(), feed.clone()),
            tags: TagService::new(db.clone(), cache.clone(), feed.clone()),
            analyzer: CodeAnalyzer::new(http.clone(), config.gemini.clone()),
            youtube: YouTubeService::new(http.clone(), config.youtube.clone()),
            github: GitHubService::new(http.clone(), config.github.clone()),
            identity: IdentityClient::new(http, config.supabase.clone()),
            storage,
            cache,
            feed,
            db,
            config: Arc::new(config),
        })
    }
}
