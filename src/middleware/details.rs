//! Exposure of internal error causes outside production.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{error::InternalDetails, AppState};

/// Rewrite error bodies carrying [`InternalDetails`] to include `details`,
/// unless the server runs in production.
pub async fn expose_internal_details(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(internal) = response.extensions_mut().remove::<InternalDetails>() else {
        return response;
    };
    if state.config.server.is_production() {
        return response;
    }

    let body = json!({ "error": internal.message, "details": internal.details });
    (response.status(), Json(body)).into_response()
}
