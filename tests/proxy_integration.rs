//! Integration tests for the third-party proxies: code analysis, tutor chat,
//! video search, repository search and signup. Upstream APIs are replaced by
//! wiremock servers.

mod common;

use axum::http::StatusCode;
use common::{build_server, test_config};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }] }
        }]
    })
}

async fn gemini_server(mock: &MockServer) -> axum_test::TestServer {
    let mut config = test_config();
    config.gemini.api_key = Some("gemini-key".to_string());
    config.gemini.base_url = mock.uri();
    build_server(config).await.0
}

async fn youtube_server(mock: &MockServer) -> axum_test::TestServer {
    let mut config = test_config();
    config.youtube.api_key = Some("yt-key".to_string());
    config.youtube.base_url = mock.uri();
    build_server(config).await.0
}

async fn github_server(mock: &MockServer, token: Option<&str>) -> axum_test::TestServer {
    let mut config = test_config();
    config.github.token = token.map(String::from);
    config.github.base_url = mock.uri();
    build_server(config).await.0
}

async fn identity_server(mock: &MockServer) -> (axum_test::TestServer, codevault::AppState) {
    let mut config = test_config();
    config.supabase.url = Some(mock.uri());
    config.supabase.service_key = Some("service-key".to_string());
    build_server(config).await
}

// ============================================================================
// Code analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_returns_parsed_model_output() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/models/[^/]+:generateContent$"))
        .and(query_param("key", "gemini-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "```json\n{\"title\":\"Debounce\",\"description\":\"Delays calls\",\"language\":\"typescript\",\"tags\":[\"react\",\"hooks\",\"timing\"]}\n```",
        )))
        .expect(1)
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "const d = useDebounce(v, 300)" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-analysis-status"), "ok");
    let body: Value = response.json();
    assert_eq!(body["title"], "Debounce");
    assert_eq!(body["tags"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_analyze_accepts_code_at_limit() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "{\"title\":\"x\",\"description\":\"y\",\"language\":\"z\",\"tags\":[]}",
        )))
        .expect(1)
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "a".repeat(200_000) }))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_analyze_rejects_oversized_code_without_calling_model() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{}")))
        .expect(0)
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "a".repeat(200_001) }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_analyze_validates_code_field() {
    let mock = MockServer::start().await;
    let server = gemini_server(&mock).await;

    let missing = server.post("/api/ai/analyze").json(&json!({})).await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    missing.assert_json(&json!({ "error": "Code is required" }));

    let wrong_type = server.post("/api/ai/analyze").json(&json!({ "code": 42 })).await;
    wrong_type.assert_status(StatusCode::BAD_REQUEST);
    wrong_type.assert_json(&json!({ "error": "Code must be a string" }));
}

#[tokio::test]
async fn test_analyze_unparseable_output_yields_fallback() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("I cannot help with that.")))
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "print(1)" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-analysis-status"), "fallback");
    let body: Value = response.json();
    assert_eq!(body["title"], "ANALYSIS_FAILED");
    assert_eq!(body["tags"], json!(["SYSTEM_ERROR"]));
}

#[tokio::test]
async fn test_analyze_upstream_failure_reports_details() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "model overloaded" }
        })))
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "print(1)" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({
        "error": "Failed to analyze code with Gemini",
        "details": "model overloaded"
    }));
}

#[tokio::test]
async fn test_analyze_without_key_is_not_configured() {
    let (server, _state) = build_server(test_config()).await;

    let response = server
        .post("/api/ai/analyze")
        .json(&json!({ "code": "print(1)" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Gemini API key is not configured");
    assert!(body["details"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

// ============================================================================
// Tutor chat
// ============================================================================

#[tokio::test]
async fn test_chat_replays_preamble_history_and_message() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "temperature": 0.7, "maxOutputTokens": 2000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            "Closures capture their environment.",
        )))
        .expect(1)
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/chat")
        .json(&json!({
            "message": "Explain closures",
            "history": [
                { "role": "user", "content": "Hi" },
                { "role": "model", "content": "Hello! What shall we learn?" }
            ]
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "reply": "Closures capture their environment." }));

    let requests = mock.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let turns = sent["contents"].as_array().unwrap();
    let roles: Vec<&str> = turns.iter().map(|t| t["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["user", "model", "user", "model", "user"]);
    assert!(turns[0]["parts"][0]["text"].as_str().unwrap().contains("CodeVault"));
    assert_eq!(turns[2]["parts"][0]["text"], "Hi");
    assert_eq!(turns[4]["parts"][0]["text"], "Explain closures");
}

#[tokio::test]
async fn test_chat_without_text_gets_apology() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server
        .post("/api/ai/chat")
        .json(&json!({ "message": "Hello" }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "reply": "Sorry, I couldn't generate a response." }));
}

#[tokio::test]
async fn test_chat_validates_before_calling_model() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("x")))
        .expect(0)
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let blank = server.post("/api/ai/chat").json(&json!({ "message": "  " })).await;
    blank.assert_status(StatusCode::BAD_REQUEST);
    blank.assert_json(&json!({ "error": "Message is required" }));

    let history: Vec<Value> = (0..51)
        .map(|i| json!({ "role": "user", "content": format!("turn {}", i) }))
        .collect();
    server
        .post("/api/ai/chat")
        .json(&json!({ "message": "next", "history": history }))
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_chat_upstream_failure_reports_details() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r":generateContent$"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "quota exhausted" }
        })))
        .mount(&mock)
        .await;
    let server = gemini_server(&mock).await;

    let response = server.post("/api/ai/chat").json(&json!({ "message": "Hi" })).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({
        "error": "Failed to get a reply from Gemini",
        "details": "quota exhausted"
    }));
}

#[tokio::test]
async fn test_chat_without_key_is_not_configured() {
    let (server, _state) = build_server(test_config()).await;

    let response = server.post("/api/ai/chat").json(&json!({ "message": "Hi" })).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["details"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

// ============================================================================
// Video search
// ============================================================================

#[tokio::test]
async fn test_search_flattens_videos() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "react course tutorial"))
        .and(query_param("type", "video"))
        .and(query_param("order", "viewCount"))
        .and(query_param("maxResults", "12"))
        .and(query_param("key", "yt-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": { "videoId": "abc" } }, { "id": { "videoId": "def" } }]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "abc,def"))
        .and(query_param("part", "snippet,contentDetails,statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "abc",
                    "snippet": {
                        "title": "React in 1 hour",
                        "channelTitle": "Dev Channel",
                        "description": "Learn React",
                        "thumbnails": {
                            "high": { "url": "https://img.test/high.jpg" },
                            "default": { "url": "https://img.test/default.jpg" }
                        }
                    },
                    "contentDetails": { "duration": "PT1H2M5S" },
                    "statistics": { "viewCount": "1500000", "likeCount": "2500" }
                },
                { "id": "def" }
            ]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    let server = youtube_server(&mock).await;

    let response = server.get("/api/youtube/search").add_query_param("q", "react").await;

    response.assert_status_ok();
    let videos: Vec<Value> = response.json();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0]["id"], "abc");
    assert_eq!(videos[0]["thumbnail"], "https://img.test/high.jpg");
    assert_eq!(videos[0]["channel"], "Dev Channel");
    assert_eq!(videos[0]["duration"], "1:02:05");
    assert_eq!(videos[0]["views"], "1.5M");
    assert_eq!(videos[0]["likes"], "2.5K");
    assert_eq!(videos[0]["category"], "YouTube");
    assert_eq!(videos[1]["duration"], "0:00");
    assert_eq!(videos[1]["views"], "0");
}

#[tokio::test]
async fn test_search_with_no_results_skips_details_call() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&mock)
        .await;
    let server = youtube_server(&mock).await;

    let response = server.get("/api/youtube/search").add_query_param("q", "zzz").await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn test_search_passes_through_api_error_code() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "quotaExceeded" }
        })))
        .mount(&mock)
        .await;
    let server = youtube_server(&mock).await;

    let response = server.get("/api/youtube/search").add_query_param("q", "rust").await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({ "error": "quotaExceeded" }));
}

#[tokio::test]
async fn test_search_validates_query() {
    let mock = MockServer::start().await;
    let server = youtube_server(&mock).await;

    server
        .get("/api/youtube/search")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/youtube/search")
        .add_query_param("q", "x".repeat(201))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_without_key_is_not_configured() {
    let (server, _state) = build_server(test_config()).await;

    let response = server.get("/api/youtube/search").add_query_param("q", "rust").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["details"].as_str().unwrap().contains("YOUTUBE_API_KEY"));
}

// ============================================================================
// Signup
// ============================================================================

#[tokio::test]
async fn test_signup_creates_account_and_profile() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(body_partial_json(json!({
            "email": "ada@example.test",
            "email_confirm": true,
            "user_metadata": { "username": "ada" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-ada",
            "email": "ada@example.test"
        })))
        .expect(1)
        .mount(&mock)
        .await;
    let (server, state) = identity_server(&mock).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "ada@example.test", "password": "secret123", "username": "ada" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "user-ada");

    let profile = codevault::db::get_profile(&state.db, "user-ada").await.unwrap();
    assert_eq!(profile.username, "ada");

    // Same username again is rejected before reaching the identity provider
    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "other@example.test", "password": "secret123", "username": "ada" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    response.assert_json(&json!({ "error": "This username is already taken." }));
}

#[tokio::test]
async fn test_signup_surfaces_identity_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "msg": "A user with this email address has already been registered"
        })))
        .mount(&mock)
        .await;
    let (server, _state) = identity_server(&mock).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "ada@example.test", "password": "secret123", "username": "ada" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({
        "error": "A user with this email address has already been registered"
    }));
}

#[tokio::test]
async fn test_signup_requires_all_fields() {
    let mock = MockServer::start().await;
    let (server, _state) = identity_server(&mock).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "ada@example.test", "password": "secret123" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Email, password, and username are required." }));
}

#[tokio::test]
async fn test_signup_without_identity_config() {
    let (server, _state) = build_server(test_config()).await;

    let response = server
        .post("/api/auth/signup")
        .json(&json!({ "email": "ada@example.test", "password": "secret123", "username": "ada" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// Repository search
// ============================================================================

fn repository(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("octo/{}", name),
        "description": "A project",
        "html_url": format!("https://github.com/octo/{}", name),
        "stargazers_count": 1200,
        "forks_count": 80,
        "language": "Rust",
        "owner": { "login": "octo", "avatar_url": "https://avatars.test/octo.png" },
        "topics": ["ignored"]
    })
}

#[tokio::test]
async fn test_repo_search_sorts_by_stars_for_language() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "web framework language:rust"))
        .and(query_param("sort", "stars"))
        .and(query_param("order", "desc"))
        .and(query_param("per_page", "12"))
        .and(header("user-agent", "CodeVault/1.0"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "items": [repository(1, "axum"), repository(2, "actix-web")]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    let server = github_server(&mock, Some("gh-token")).await;

    let response = server
        .get("/api/repos/search")
        .add_query_param("q", "web framework")
        .add_query_param("language", "Rust")
        .await;

    response.assert_status_ok();
    let repos: Vec<Value> = response.json();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0]["full_name"], "octo/axum");
    assert_eq!(repos[0]["stargazers_count"], 1200);
    assert_eq!(repos[0]["owner"]["login"], "octo");
    assert!(repos[0].get("topics").is_none());
}

#[tokio::test]
async fn test_repo_search_defaults_to_javascript_without_token() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "language:javascript"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&mock)
        .await;
    let server = github_server(&mock, None).await;

    let response = server.get("/api/repos/search").await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
    let requests = mock.received_requests().await.unwrap();
    assert!(requests[0].headers.get(&wiremock::http::HeaderName::from("authorization")).is_none());
}

#[tokio::test]
async fn test_repo_search_passes_through_rate_limit() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "API rate limit exceeded"
        })))
        .mount(&mock)
        .await;
    let server = github_server(&mock, None).await;

    let response = server.get("/api/repos/search").add_query_param("q", "cli").await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({ "error": "API rate limit exceeded" }));
}

#[tokio::test]
async fn test_repo_search_unreachable_upstream() {
    let (server, _state) = build_server(test_config()).await;

    let response = server.get("/api/repos/search").add_query_param("q", "cli").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({ "error": "Failed to fetch repositories from GitHub" }));
}

#[tokio::test]
async fn test_repo_search_validates_params() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&mock)
        .await;
    let server = github_server(&mock, None).await;

    server
        .get("/api/repos/search")
        .add_query_param("q", "x".repeat(201))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/repos/search")
        .add_query_param("language", "rust stars:>1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
