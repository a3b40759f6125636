//! CodeVault - code snippet vault
//!
//! Stores, tags, searches and shares code snippets, attaches PDF notes, and
//! proxies code analysis, tutor chat, learning video search and open-source
//! project search to third-party APIs.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::{config, Config};
pub use error::{Error, Result};
pub use state::AppState;

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Limit for JSON request bodies.
pub const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Build the complete application router.
///
/// Layer order, outermost first: security headers, origin allow-list, CORS,
/// request tracing, body limit, internal error details. `/api` additionally
/// resolves the bearer token.
pub fn build_router(state: AppState) -> Router {
    let api = api::routes(&state)
        .layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let router = Router::new()
        .merge(api::status::routes())
        .nest("/api", api)
        .fallback_service(frontend_service(&state.config.server.frontend_dist))
        .layer(from_fn_with_state(state.clone(), middleware::expose_internal_details))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors.allowed_origins))
        .layer(from_fn_with_state(state.clone(), middleware::require_allowed_origin))
        .with_state(state);

    middleware::with_security_headers(router)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(api::ANALYSIS_STATUS_HEADER)])
        .allow_credentials(true)
}

/// Static frontend with SPA fallback to `index.html`.
fn frontend_service(dist: &str) -> ServeDir<ServeFile> {
    ServeDir::new(dist).fallback(ServeFile::new(Path::new(dist).join("index.html")))
}
