//! Open-source project search through the GitHub REST API.
//!
//! Searches are scoped to a language and sorted by stars. The token is
//! optional; anonymous calls work within GitHub's lower rate limit.

use axum::http::StatusCode;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::GitHubConfig;
use crate::models::Repository;
use crate::{Error, Result};

/// Language searched when none is given.
pub const DEFAULT_LANGUAGE: &str = "javascript";
/// Longest accepted free-text query, in characters.
pub const MAX_QUERY_CHARS: usize = 200;
/// Repositories requested per search.
pub const PER_PAGE: u32 = 12;

const USER_AGENT: &str = "CodeVault/1.0";
const API_VERSION: &str = "2022-11-28";

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoQuery {
    pub text: Option<String>,
    pub language: String,
}

impl RepoQuery {
    /// GitHub search expression: `{text} language:{lang}`.
    pub fn search_expression(&self) -> String {
        match &self.text {
            Some(text) => format!("{} language:{}", text, self.language),
            None => format!("language:{}", self.language),
        }
    }
}

pub fn validate_query(q: Option<&str>, language: Option<&str>) -> Result<RepoQuery> {
    let text = q.map(str::trim).filter(|q| !q.is_empty());
    if text.is_some_and(|t| t.chars().count() > MAX_QUERY_CHARS) {
        return Err(Error::Validation(r#"Query parameter "q" too long"#.into()));
    }

    let language = language.map(str::trim).filter(|l| !l.is_empty());
    let language = match language {
        None => DEFAULT_LANGUAGE.to_string(),
        Some(l) if l.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '.')) => {
            l.to_lowercase()
        }
        Some(_) => return Err(Error::Validation("Invalid language".into())),
    };

    Ok(RepoQuery {
        text: text.map(String::from),
        language,
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

fn fetch_failed(cause: impl std::fmt::Display) -> Error {
    error!(error = %cause, "GitHub search failed");
    Error::Upstream {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Failed to fetch repositories from GitHub".to_string(),
        details: None,
    }
}

/// GitHub search client.
#[derive(Clone)]
pub struct GitHubService {
    client: Client,
    config: GitHubConfig,
}

impl GitHubService {
    pub fn new(client: Client, config: GitHubConfig) -> Self {
        Self { client, config }
    }

    fn build_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", header::HeaderValue::from_static(API_VERSION));
        if let Some(token) = &self.config.token {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => error!(error = %e, "GitHub token is not a valid header value"),
            }
        }
        headers
    }

    /// Most-starred repositories matching an already-validated query.
    pub async fn search_repositories(&self, query: &RepoQuery) -> Result<Vec<Repository>> {
        let url = format!(
            "{}/search/repositories",
            self.config.base_url.trim_end_matches('/')
        );
        let expression = query.search_expression();
        let per_page = PER_PAGE.to_string();

        debug!(q = %expression, "Searching GitHub repositories");

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers())
            .query(&[
                ("q", expression.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .map_err(fetch_failed)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("GitHub API error {}", status));
            error!(%status, message = %message, "GitHub rejected the search");
            return Err(Error::Upstream {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
                details: None,
            });
        }

        let body: SearchResponse = response.json().await.map_err(fetch_failed)?;
        Ok(body.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, "language:javascript")]
    #[case(Some("  "), Some("Rust"), "language:rust")]
    #[case(Some("web framework"), Some("go"), "web framework language:go")]
    #[case(Some("parser"), Some("c++"), "parser language:c++")]
    fn test_search_expression(
        #[case] q: Option<&str>,
        #[case] language: Option<&str>,
        #[case] expected: &str,
    ) {
        let query = validate_query(q, language).unwrap();
        assert_eq!(query.search_expression(), expected);
    }

    #[test]
    fn test_validate_query_limits() {
        assert!(validate_query(Some(&"q".repeat(MAX_QUERY_CHARS)), None).is_ok());
        assert!(matches!(
            validate_query(Some(&"q".repeat(MAX_QUERY_CHARS + 1)), None),
            Err(Error::Validation(m)) if m.contains("too long")
        ));
        assert!(matches!(
            validate_query(None, Some("rust stars:>1")),
            Err(Error::Validation(_))
        ));
    }
}
