//! Repository Routes
//!
//! Routes:
//! - GET /repos/search?q=&language= - Most-starred open-source projects

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::models::Repository;
use crate::services::github;
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search_repositories))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub language: Option<String>,
}

/// GET /repos/search
async fn search_repositories(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Repository>>> {
    let query = github::validate_query(params.q.as_deref(), params.language.as_deref())?;
    let repositories = state.github.search_repositories(&query).await?;
    Ok(Json(repositories))
}
