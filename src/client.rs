//! Typed HTTP client for the CodeVault API.
//!
//! Every request carries a timeout: 15 seconds by default, 60 seconds for
//! code analysis and tutor chat. Non-2xx responses surface the body's `message` or `error`
//! field, or `Request failed (<status>)` when neither is present.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::{Note, Profile, Review};
use crate::models::{
    CreateSnippetInput, CreateTagInput, Repository, Snippet, Tag, UpdateSnippetInput, Video,
};
use crate::services::ChatMessage;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for the analysis and chat calls, which wait on the model.
pub const ANALYZE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request timed out")]
    Timeout,

    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Filters for snippet listings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnippetQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Comma-separated tag names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

/// CodeVault API client.
#[derive(Clone)]
pub struct CodeVaultClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl CodeVaultClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Override the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(timeout);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(builder: RequestBuilder) -> ClientResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Err(ClientError::Http {
            status,
            message: error_message(status, &body),
        })
    }

    pub async fn health(&self) -> ClientResult<Value> {
        Self::send(self.request(Method::GET, "/health", self.timeout)).await
    }

    /// Analyze code. Returns the analysis and whether it is the placeholder.
    pub async fn analyze_code(&self, code: &str) -> ClientResult<(Value, bool)> {
        let response = self
            .request(Method::POST, "/api/ai/analyze", ANALYZE_TIMEOUT.max(self.timeout))
            .json(&json!({ "code": code }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let fallback = response
            .headers()
            .get(crate::api::ANALYSIS_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            == Some("fallback");
        Ok((response.json().await?, fallback))
    }

    /// Ask the tutor. Returns the reply text.
    pub async fn chat(&self, history: &[ChatMessage], message: &str) -> ClientResult<String> {
        let body: Value = Self::send(
            self.request(Method::POST, "/api/ai/chat", ANALYZE_TIMEOUT.max(self.timeout))
                .json(&json!({ "message": message, "history": history })),
        )
        .await?;
        body.get("reply")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ClientError::Decode("missing reply".to_string()))
    }

    pub async fn search_repositories(
        &self,
        query: Option<&str>,
        language: Option<&str>,
    ) -> ClientResult<Vec<Repository>> {
        let mut params = Vec::new();
        if let Some(q) = query {
            params.push(("q", q));
        }
        if let Some(language) = language {
            params.push(("language", language));
        }
        Self::send(
            self.request(Method::GET, "/api/repos/search", self.timeout)
                .query(&params),
        )
        .await
    }

    pub async fn search_videos(&self, query: &str) -> ClientResult<Vec<Video>> {
        Self::send(
            self.request(Method::GET, "/api/youtube/search", self.timeout)
                .query(&[("q", query)]),
        )
        .await
    }

    pub async fn signup(&self, email: &str, password: &str, username: &str) -> ClientResult<Value> {
        Self::send(
            self.request(Method::POST, "/api/auth/signup", self.timeout)
                .json(&json!({ "email": email, "password": password, "username": username })),
        )
        .await
    }

    pub async fn list_snippets(&self, query: &SnippetQuery) -> ClientResult<Vec<Snippet>> {
        Self::send(self.request(Method::GET, "/api/snippets", self.timeout).query(query)).await
    }

    pub async fn list_public_snippets(&self, query: &SnippetQuery) -> ClientResult<Vec<Snippet>> {
        Self::send(
            self.request(Method::GET, "/api/snippets/public", self.timeout)
                .query(query),
        )
        .await
    }

    pub async fn get_snippet(&self, id: &str) -> ClientResult<Snippet> {
        Self::send(self.request(Method::GET, &format!("/api/snippets/{}", id), self.timeout)).await
    }

    pub async fn create_snippet(&self, input: &CreateSnippetInput) -> ClientResult<Snippet> {
        Self::send(
            self.request(Method::POST, "/api/snippets", self.timeout)
                .json(input),
        )
        .await
    }

    pub async fn update_snippet(&self, id: &str, input: &UpdateSnippetInput) -> ClientResult<Snippet> {
        Self::send(
            self.request(Method::PATCH, &format!("/api/snippets/{}", id), self.timeout)
                .json(input),
        )
        .await
    }

    pub async fn delete_snippet(&self, id: &str) -> ClientResult<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/api/snippets/{}", id), self.timeout))
            .await
    }

    pub async fn set_favorite(&self, id: &str, is_favorite: bool) -> ClientResult<Snippet> {
        Self::send(
            self.request(Method::PUT, &format!("/api/snippets/{}/favorite", id), self.timeout)
                .json(&json!({ "is_favorite": is_favorite })),
        )
        .await
    }

    pub async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        Self::send(self.request(Method::GET, "/api/tags", self.timeout)).await
    }

    pub async fn create_tag(&self, input: &CreateTagInput) -> ClientResult<Tag> {
        Self::send(self.request(Method::POST, "/api/tags", self.timeout).json(input)).await
    }

    pub async fn delete_tag(&self, id: &str) -> ClientResult<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/api/tags/{}", id), self.timeout)).await
    }

    pub async fn list_notes(&self) -> ClientResult<Vec<Note>> {
        Self::send(self.request(Method::GET, "/api/notes", self.timeout)).await
    }

    pub async fn list_recently_viewed(&self) -> ClientResult<Vec<Video>> {
        Self::send(self.request(Method::GET, "/api/learning/recent", self.timeout)).await
    }

    pub async fn record_view(&self, video: &Video) -> ClientResult<Vec<Video>> {
        Self::send(
            self.request(Method::POST, "/api/learning/recent", self.timeout)
                .json(video),
        )
        .await
    }

    pub async fn list_reviews(&self) -> ClientResult<Vec<Review>> {
        Self::send(self.request(Method::GET, "/api/reviews", self.timeout)).await
    }

    pub async fn create_review(&self, rating: i64, content: &str) -> ClientResult<Review> {
        Self::send(
            self.request(Method::POST, "/api/reviews", self.timeout)
                .json(&json!({ "rating": rating, "content": content })),
        )
        .await
    }

    pub async fn get_profile(&self) -> ClientResult<Profile> {
        Self::send(self.request(Method::GET, "/api/profile", self.timeout)).await
    }
}

fn error_message(status: StatusCode, body: &Value) -> String {
    ["message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(String::from)
        .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_then_error() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(error_message(status, &json!({"message": "m", "error": "e"})), "m");
        assert_eq!(error_message(status, &json!({"error": "e"})), "e");
        assert_eq!(error_message(status, &Value::Null), "Request failed (400)");
    }
}
