//! Integration tests for the typed API client.

mod common;

use std::time::Duration;

use codevault::client::{ClientError, CodeVaultClient, SnippetQuery};
use codevault::models::{CreateSnippetInput, CreateTagInput, UpdateSnippetInput};
use codevault::services::{ChatMessage, ChatRole};
use codevault::build_router;
use common::{build_state, test_config, token_for};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the full router on an ephemeral port and return its base URL.
async fn spawn_app() -> String {
    let state = build_state(test_config()).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_client_snippet_workflow() {
    let base = spawn_app().await;
    let client = CodeVaultClient::new(&base).with_token(token_for("alice"));

    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "ok");

    client
        .create_tag(&CreateTagInput {
            name: "rust".into(),
            color: None,
        })
        .await
        .unwrap();

    let snippet = client
        .create_snippet(&CreateSnippetInput {
            title: "Vec sort".into(),
            code: "v.sort();".into(),
            language: Some("rust".into()),
            tags: vec!["rust".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(snippet.tags.len(), 1);

    let updated = client
        .update_snippet(
            &snippet.id,
            &UpdateSnippetInput {
                description: Some("Sort in place".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Vec sort");
    assert_eq!(updated.description.as_deref(), Some("Sort in place"));

    let favorite = client.set_favorite(&snippet.id, true).await.unwrap();
    assert!(favorite.is_favorite);

    let listed = client
        .list_snippets(&SnippetQuery {
            tags: Some("RUST".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    client.delete_snippet(&snippet.id).await.unwrap();
    let err = client.get_snippet(&snippet.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_client_surfaces_server_error_message() {
    let base = spawn_app().await;
    let client = CodeVaultClient::new(&base);

    let err = client.list_notes().await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.to_string(), "Not authenticated");
}

#[tokio::test]
async fn test_client_falls_back_to_status_message() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reviews"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock)
        .await;

    let err = CodeVaultClient::new(mock.uri()).list_reviews().await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(err.to_string(), "Request failed (502)");
}

#[tokio::test]
async fn test_client_prefers_message_field() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Profile locked",
            "error": "generic"
        })))
        .mount(&mock)
        .await;

    let err = CodeVaultClient::new(mock.uri()).get_profile().await.unwrap_err();

    assert_eq!(err.to_string(), "Profile locked");
}

#[tokio::test]
async fn test_client_reports_fallback_analysis() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-analysis-status", "fallback")
                .set_body_json(json!({ "title": "ANALYSIS_FAILED" })),
        )
        .mount(&mock)
        .await;

    let (value, fallback) = CodeVaultClient::new(mock.uri())
        .analyze_code("print(1)")
        .await
        .unwrap();

    assert!(fallback);
    assert_eq!(value["title"], "ANALYSIS_FAILED");
}

#[tokio::test]
async fn test_client_chat_sends_history() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/chat"))
        .and(body_partial_json(json!({
            "message": "And in Rust?",
            "history": [{ "role": "user", "content": "What is a trait?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Use impl blocks." })))
        .expect(1)
        .mount(&mock)
        .await;

    let history = vec![ChatMessage {
        role: ChatRole::User,
        content: "What is a trait?".to_string(),
    }];
    let reply = CodeVaultClient::new(mock.uri())
        .chat(&history, "And in Rust?")
        .await
        .unwrap();

    assert_eq!(reply, "Use impl blocks.");
}

#[tokio::test]
async fn test_client_repository_search() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/repos/search"))
        .and(query_param("q", "cli"))
        .and(query_param("language", "go"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "name": "cobra",
            "full_name": "spf13/cobra",
            "description": null,
            "html_url": "https://github.com/spf13/cobra",
            "stargazers_count": 38000,
            "forks_count": 2800,
            "language": "Go",
            "owner": { "login": "spf13", "avatar_url": null }
        }])))
        .expect(1)
        .mount(&mock)
        .await;

    let repos = CodeVaultClient::new(mock.uri())
        .search_repositories(Some("cli"), Some("go"))
        .await
        .unwrap();

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].full_name, "spf13/cobra");
    assert_eq!(repos[0].stargazers_count, 38000);
    assert!(repos[0].description.is_none());
}

#[tokio::test]
async fn test_client_times_out() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock)
        .await;

    let err = CodeVaultClient::new(mock.uri())
        .with_timeout(Duration::from_millis(100))
        .health()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout));
}
