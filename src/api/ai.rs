//! AI Routes
//!
//! Routes:
//! - POST /ai/analyze - Describe a piece of code with the generative model
//! - POST /ai/chat - Ask the coding tutor, replaying prior turns

use axum::{
    extract::State,
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::analyzer::{self, ChatMessage};
use crate::{AppState, Result};

/// Header telling clients whether the body is a real analysis or the placeholder.
pub const ANALYSIS_STATUS_HEADER: &str = "x-analysis-status";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze_code))
        .route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Analyze code.
///
/// POST /ai/analyze
///
/// Body: `{"code": "..."}`. Responds with `{title, description, language,
/// tags}`; unparseable model output yields the fallback object with
/// `x-analysis-status: fallback`.
async fn analyze_code(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Response> {
    let code = analyzer::validate_code(body.get("code"))?;
    let outcome = state.analyzer.analyze(&code).await?;

    let status = if outcome.is_fallback() { "fallback" } else { "ok" };
    Ok((
        [(HeaderName::from_static(ANALYSIS_STATUS_HEADER), status)],
        Json(outcome.into_value()),
    )
        .into_response())
}

/// Chat with the tutor.
///
/// POST /ai/chat
///
/// Body: `{"message": "...", "history": [{"role": "user"|"model", "content"}]}`.
/// Responds with `{"reply": "..."}`.
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Result<Json<ChatResponse>> {
    let message = analyzer::validate_chat(&request.message, &request.history)?;
    let reply = state.analyzer.chat(&request.history, &message).await?;
    Ok(Json(ChatResponse { reply }))
}
