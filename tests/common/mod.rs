//! Common test utilities and helpers.

#![allow(dead_code)]

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue};
use axum_test::TestServer;
use codevault::middleware::Claims;
use codevault::{build_router, AppState, Config};
use jsonwebtoken::{encode, EncodingKey, Header};

pub const JWT_SECRET: &str = "test-jwt-secret";

/// Test configuration: in-memory database, token verification enabled,
/// no third-party keys.
pub fn test_config() -> Config {
    let mut config = Config::for_testing();
    config.supabase.jwt_secret = Some(JWT_SECRET.to_string());
    config
}

pub async fn build_state(config: Config) -> AppState {
    AppState::with_config(config)
        .await
        .expect("Failed to build test state")
}

pub async fn build_server(config: Config) -> (TestServer, AppState) {
    let state = build_state(config).await;
    let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");
    (server, state)
}

pub async fn default_server() -> (TestServer, AppState) {
    build_server(test_config()).await
}

/// Mint an access token for a user.
pub fn token_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        email: Some(format!("{}@example.test", user_id)),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode token")
}

/// `Authorization` header for a user.
pub fn auth(user_id: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token_for(user_id))).unwrap(),
    )
}

/// Build a multipart body with an optional title field and one file field.
pub fn multipart_body(
    boundary: &str,
    title: Option<&str>,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{}\r\n",
                boundary, title
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            boundary, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
