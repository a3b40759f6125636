//! Snippet Routes
//!
//! Routes:
//! - GET /snippets - List the caller's snippets (anonymous: empty list)
//! - POST /snippets - Create a snippet
//! - GET /snippets/public - List public snippets from other users
//! - GET /snippets/:id - Get one snippet (own, or anyone's public one)
//! - PATCH /snippets/:id - Partially update a snippet
//! - DELETE /snippets/:id - Delete a snippet
//! - PUT /snippets/:id/favorite - Set the favorite flag

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::middleware::AuthUser;
use crate::models::{CreateSnippetInput, Snippet, SnippetFilters, UpdateSnippetInput, Visibility};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_snippets).post(create_snippet))
        .route("/public", get(list_public_snippets))
        .route(
            "/:id",
            get(get_snippet).patch(update_snippet).delete(delete_snippet),
        )
        .route("/:id/favorite", put(set_favorite))
}

// ============================================================================
// Request Types
// ============================================================================

/// Listing query string. `tags` is a comma-separated list of names.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub language: Option<String>,
    pub tags: Option<String>,
    pub visibility: Option<Visibility>,
    pub favorite: Option<bool>,
}

impl From<ListParams> for SnippetFilters {
    fn from(params: ListParams) -> Self {
        SnippetFilters {
            query: params.q,
            language: params.language,
            tags: params
                .tags
                .map(|t| t.split(',').map(String::from).collect())
                .unwrap_or_default(),
            visibility: params.visibility,
            favorite: params.favorite,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /snippets
async fn list_snippets(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Snippet>>> {
    let user_id = user.as_ref().map(|u| u.user_id.as_str());
    let snippets = state.snippets.list_owned(user_id, params.into()).await?;
    Ok(Json(snippets))
}

/// GET /snippets/public
async fn list_public_snippets(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Snippet>>> {
    let user_id = user.as_ref().map(|u| u.user_id.as_str());
    let snippets = state.snippets.list_public(user_id, params.into()).await?;
    Ok(Json(snippets))
}

/// POST /snippets
async fn create_snippet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateSnippetInput>,
) -> Result<(StatusCode, Json<Snippet>)> {
    let snippet = state.snippets.create(&user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

/// GET /snippets/:id
async fn get_snippet(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Snippet>> {
    let user_id = user.as_ref().map(|u| u.user_id.as_str());
    Ok(Json(state.snippets.get(user_id, &id).await?))
}

/// PATCH /snippets/:id
async fn update_snippet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateSnippetInput>,
) -> Result<Json<Snippet>> {
    Ok(Json(state.snippets.update(&user.user_id, &id, input).await?))
}

/// DELETE /snippets/:id
async fn delete_snippet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.snippets.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /snippets/:id/favorite
async fn set_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<Snippet>> {
    let snippet = state
        .snippets
        .toggle_favorite(&user.user_id, &id, request.is_favorite)
        .await?;
    Ok(Json(snippet))
}
