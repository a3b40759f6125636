//! Auth Routes
//!
//! Routes:
//! - POST /auth/signup - Create a confirmed account with a unique username

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tracing::warn;

use crate::db::{self, UpsertProfile};
use crate::services::{ChangeOp, SignupRequest, Table};
use crate::{AppState, Error, Result};

pub fn routes() -> Router<AppState> {
    Router::new().route("/signup", post(signup))
}

/// Sign up.
///
/// POST /auth/signup
///
/// Body: `{email, password, username}`. Returns `{success: true, user}`.
async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<Value>> {
    let account = request.validate()?;
    state.identity.ensure_configured()?;

    if db::username_exists(&state.db, &account.username).await? {
        return Err(Error::Conflict("This username is already taken.".to_string()));
    }

    let user = state.identity.create_user(&account).await?;

    match user.get("id").and_then(Value::as_str) {
        Some(user_id) => {
            let profile = UpsertProfile {
                id: user_id.to_string(),
                username: account.username.clone(),
                full_name: None,
                avatar_url: None,
            };
            match db::upsert_profile(&state.db, profile).await {
                Ok(_) => state
                    .feed
                    .changed(Table::Profiles, ChangeOp::Insert, user_id, Some(user_id)),
                Err(e) => warn!(error = %e, user_id, "Account created but profile insert failed"),
            }
        }
        None => warn!("Identity provider returned a user without an id"),
    }

    Ok(Json(json!({ "success": true, "user": user })))
}
