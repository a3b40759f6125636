//! Review Routes
//!
//! Routes:
//! - GET /reviews - Public list, newest first
//! - POST /reviews - Leave a review (rating 1-5)

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use crate::db::{self, NewReview, Review};
use crate::middleware::AuthUser;
use crate::{AppState, Error, Result};

/// Reviews returned per listing.
const LIST_LIMIT: i64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_reviews).post(create_review))
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub content: String,
}

/// GET /reviews
async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>> {
    Ok(Json(db::list_reviews(&state.db, LIST_LIMIT).await?))
}

/// POST /reviews
async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    if !(1..=5).contains(&request.rating) {
        return Err(Error::Validation("Rating must be between 1 and 5".to_string()));
    }
    let content = request.content.trim();
    if content.is_empty() {
        return Err(Error::Validation("Review content is required".to_string()));
    }

    let review = db::create_review(
        &state.db,
        NewReview {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id,
            rating: request.rating,
            content: content.to_string(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review)))
}
