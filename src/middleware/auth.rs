//! Bearer token authentication.
//!
//! Access tokens are HS256 JWTs issued by the identity provider. The `sub`
//! claim is the user id. A request without a token is anonymous; a request
//! with a bad token is rejected outright.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::Error, AppState};

/// Claims read from an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authenticated caller, injected into request extensions by [`authenticate`].
///
/// Use `AuthUser` as an extractor on routes that need a user (401 otherwise)
/// and `Option<AuthUser>` on routes that also serve anonymous callers.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(Error::Unauthenticated)
    }
}

/// Verify a token against the shared secret.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            debug!(error = %e, "Token rejected");
            Error::InvalidToken
        })?;

    if data.claims.sub.is_empty() {
        return Err(Error::InvalidToken);
    }

    Ok(AuthUser {
        user_id: data.claims.sub,
        email: data.claims.email,
    })
}

/// Middleware that resolves the bearer token, if any, into an [`AuthUser`].
///
/// # Errors
///
/// Returns 401 if a token is present but invalid or expired, and 500 if a
/// token is presented while no verification secret is configured.
pub async fn authenticate(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        let secret = state.config.supabase.jwt_secret.as_deref().ok_or_else(|| {
            Error::not_configured(
                "Authentication is not configured",
                "Please add SUPABASE_JWT_SECRET to your backend .env file.",
            )
        })?;
        let user = verify_token(bearer.token(), secret)?;
        req.extensions_mut().insert(user);
    }

    Ok(next.run(req).await)
}
