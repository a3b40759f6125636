//! YouTube Routes
//!
//! Routes:
//! - GET /youtube/search?q= - Search educational videos

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::models::Video;
use crate::services::youtube;
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search_videos))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /youtube/search
async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Video>>> {
    let query = youtube::validate_query(params.q.as_deref())?;
    let videos = state.youtube.search(&query).await?;
    Ok(Json(videos))
}
