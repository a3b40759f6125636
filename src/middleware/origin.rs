//! Origin allow-list.
//!
//! Browser requests carrying an `Origin` outside the configured list are
//! refused before they reach any handler. Requests without an `Origin`
//! header (same-origin navigation, server-to-server) pass through.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::ORIGIN,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::Error, AppState};

pub async fn require_allowed_origin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    if let Some(origin) = req.headers().get(ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| state.config.cors.is_allowed(o))
            .unwrap_or(false);
        if !allowed {
            warn!(origin = ?origin, "Blocked request from disallowed origin");
            return Err(Error::OriginNotAllowed);
        }
    }

    Ok(next.run(req).await)
}
