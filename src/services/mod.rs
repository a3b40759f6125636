//! Service layer for CodeVault.
//!
//! Contains business logic and external service integrations:
//! - Snippets and tags (store access with the query cache)
//! - Cache (read-through query cache with explicit invalidation)
//! - Events (in-process change feed driving invalidation)
//! - Analyzer (Gemini code analysis and tutor chat)
//! - YouTube (learning video search)
//! - GitHub (open-source project search)
//! - Identity (admin account creation)
//! - Storage (note attachment blobs)

pub mod analyzer;
pub mod cache;
pub mod events;
pub mod github;
mod identity;
mod snippets;
mod storage;
mod tags;
pub mod youtube;

pub use analyzer::{AnalysisOutcome, ChatMessage, ChatRole, CodeAnalyzer};
pub use cache::{CacheKey, CachedValue, QueryCache, ResourceKind};
pub use events::{spawn_invalidation_listener, ChangeEvent, ChangeFeed, ChangeOp, Table};
pub use github::{GitHubService, RepoQuery};
pub use identity::{IdentityClient, NewAccount, SignupRequest};
pub use snippets::SnippetService;
pub use storage::{object_key, safe_file_name, LocalObjectStorage, ObjectStorage};
pub use tags::TagService;
pub use youtube::YouTubeService;
