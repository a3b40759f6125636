//! Review queries.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{now_timestamp, DbPool};
use crate::Result;

/// Review record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub rating: i64,
    pub content: String,
    pub created_at: String,
}

/// Input for creating a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub id: String,
    pub user_id: String,
    pub rating: i64,
    pub content: String,
}

/// List reviews, newest first.
pub async fn list_reviews(pool: &DbPool, limit: i64) -> Result<Vec<Review>> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(reviews)
}

/// Insert a review.
pub async fn create_review(pool: &DbPool, input: NewReview) -> Result<Review> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (id, user_id, rating, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.user_id)
    .bind(input.rating)
    .bind(&input.content)
    .bind(now_timestamp())
    .fetch_one(pool)
    .await?;
    Ok(review)
}
