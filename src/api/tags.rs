//! Tag Routes
//!
//! Routes:
//! - GET /tags - List the caller's tags (anonymous: empty list)
//! - POST /tags - Create a tag
//! - DELETE /tags/:id - Delete a tag and its snippet associations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::middleware::AuthUser;
use crate::models::{CreateTagInput, Tag};
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", delete(delete_tag))
}

/// GET /tags
async fn list_tags(
    State(state): State<AppState>,
    user: Option<AuthUser>,
) -> Result<Json<Vec<Tag>>> {
    let user_id = user.as_ref().map(|u| u.user_id.as_str());
    Ok(Json(state.tags.list(user_id).await?))
}

/// POST /tags
async fn create_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateTagInput>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = state.tags.create(&user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// DELETE /tags/:id
async fn delete_tag(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.tags.delete(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
