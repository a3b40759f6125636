//! Middleware for CodeVault.
//!
//! - `auth` - bearer token verification and the `AuthUser` extractor
//! - `origin` - origin allow-list enforcement
//! - `details` - internal error causes for non-production responses
//! - security headers applied to every response

mod auth;
mod details;
mod origin;

pub use auth::{authenticate, verify_token, AuthUser, Claims};
pub use details::expose_internal_details;
pub use origin::require_allowed_origin;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

/// Add the fixed security headers to every response of the router.
pub fn with_security_headers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
            )),
    )
}
