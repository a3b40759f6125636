//! Learning Routes
//!
//! Routes:
//! - GET /learning/recent - The caller's recently viewed videos, newest first
//! - POST /learning/recent - Record a view (keeps the 10 most recent)
//! - DELETE /learning/recent/:video_id - Forget one video

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::db;
use crate::middleware::AuthUser;
use crate::models::Video;
use crate::{AppState, Error, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recent", get(list_recent).post(record_view))
        .route("/recent/:video_id", delete(remove_recent))
}

/// GET /learning/recent
async fn list_recent(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Video>>> {
    Ok(Json(db::list_recently_viewed(&state.db, &user.user_id).await?))
}

/// Record a view and return the updated list.
///
/// POST /learning/recent
async fn record_view(
    State(state): State<AppState>,
    user: AuthUser,
    Json(video): Json<Video>,
) -> Result<Json<Vec<Video>>> {
    if video.id.trim().is_empty() {
        return Err(Error::Validation("Video id is required".to_string()));
    }
    db::record_view(&state.db, &user.user_id, &video).await?;
    Ok(Json(db::list_recently_viewed(&state.db, &user.user_id).await?))
}

/// DELETE /learning/recent/:video_id
async fn remove_recent(
    State(state): State<AppState>,
    user: AuthUser,
    Path(video_id): Path<String>,
) -> Result<StatusCode> {
    if !db::remove_recently_viewed(&state.db, &user.user_id, &video_id).await? {
        return Err(Error::NotFound(format!("Video not found: {}", video_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
