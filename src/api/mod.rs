//! API Routes for CodeVault
//!
//! This module combines all API routes into a single router, mounted under
//! `/api`. Routes are organized by domain; handlers that need a user take the
//! `AuthUser` extractor, listing handlers take `Option<AuthUser>`.

mod ai;
mod auth;
mod learning;
mod notes;
mod profile;
mod repos;
mod reviews;
mod snippets;
pub mod status;
mod tags;
mod youtube;

pub use ai::ANALYSIS_STATUS_HEADER;

use axum::{http::StatusCode, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// Build the API router.
///
/// Route structure:
/// - /ai/analyze, /ai/chat - Code analysis and tutor chat proxies
/// - /youtube/search - Video search proxy
/// - /repos/search - Open-source project search proxy
/// - /auth/signup - Account creation
/// - /snippets/*, /tags/* - Snippet vault
/// - /notes/* - PDF notes
/// - /learning/recent/* - Recently viewed videos
/// - /reviews - Reviews
/// - /profile - The caller's profile
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/ai", ai::routes())
        .nest("/youtube", youtube::routes())
        .nest("/repos", repos::routes())
        .nest("/auth", auth::routes())
        .nest("/snippets", snippets::routes())
        .nest("/tags", tags::routes())
        .nest("/notes", notes::routes(state.config.storage.max_attachment_size))
        .nest("/learning", learning::routes())
        .nest("/reviews", reviews::routes())
        .nest("/profile", profile::routes())
        .fallback(api_not_found)
}

async fn api_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API route not found" })),
    )
}
