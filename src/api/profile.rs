//! Profile Routes
//!
//! Routes:
//! - GET /profile - The caller's profile
//! - PUT /profile - Create or replace the caller's profile

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::db::{self, Profile, UpsertProfile};
use crate::middleware::AuthUser;
use crate::services::{ChangeOp, Table};
use crate::{AppState, Error, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// GET /profile
async fn get_profile(State(state): State<AppState>, user: AuthUser) -> Result<Json<Profile>> {
    Ok(Json(db::get_profile(&state.db, &user.user_id).await?))
}

/// PUT /profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(Error::Validation("Username is required".to_string()));
    }
    let blank_to_none = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let profile = db::upsert_profile(
        &state.db,
        UpsertProfile {
            id: user.user_id.clone(),
            username: username.to_string(),
            full_name: blank_to_none(request.full_name),
            avatar_url: blank_to_none(request.avatar_url),
        },
    )
    .await?;

    state
        .feed
        .changed(Table::Profiles, ChangeOp::Update, &user.user_id, Some(&user.user_id));
    Ok(Json(profile))
}
