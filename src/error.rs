//! Error types for CodeVault.
//!
//! Uses thiserror for ergonomic error definitions that integrate
//! with axum's response system. Every error renders as
//! `{"error": message}`, with an optional `details` hint.
//!
//! Database causes are never written to the body here. They ride along as an
//! [`InternalDetails`] response extension, and the router decides from its
//! own configuration whether to expose them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

pub type Result<T> = std::result::Result<T, Error>;

/// Cause of an internal failure, withheld from the response body.
#[derive(Debug, Clone)]
pub struct InternalDetails {
    pub message: String,
    pub details: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth errors
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Origin not allowed")]
    OriginNotAllowed,

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // Validation errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    InvalidFileType(String),

    // Configuration errors
    #[error("{message}")]
    NotConfigured { message: String, details: String },

    // External service errors
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Missing third-party configuration, with a remediation hint.
    pub fn not_configured(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Upstream failure reported as a 500 with the cause in `details`.
    pub fn upstream(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401
            Self::Unauthenticated | Self::InvalidToken => StatusCode::UNAUTHORIZED,

            // 403
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,

            // 404
            Self::NotFound(_) => StatusCode::NOT_FOUND,

            // 409
            Self::Conflict(_) => StatusCode::CONFLICT,

            // 400
            Self::Validation(_) | Self::InvalidFileType(_) | Self::Identity(_) => {
                StatusCode::BAD_REQUEST
            }

            // 413
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,

            // Upstream decides
            Self::Upstream { status, .. } => *status,

            // 500
            Self::NotConfigured { .. }
            | Self::Database(_)
            | Self::Storage(_)
            | Self::Internal(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::OriginNotAllowed => "ORIGIN_NOT_ALLOWED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::InvalidFileType(_) => "INVALID_FILE_TYPE",
            Self::NotConfigured { .. } => "NOT_CONFIGURED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Identity(_) => "IDENTITY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::NotConfigured { details, .. } => Some(details.clone()),
            Self::Upstream { details, .. } => details.clone(),
            _ => None,
        }
    }

    /// Store messages can leak schema details, so they are kept off the body.
    fn internal_details(&self) -> Option<InternalDetails> {
        match self {
            Self::Database(err) => Some(InternalDetails {
                message: self.to_string(),
                details: err.to_string(),
            }),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = ?self, "Request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "Request rejected");
        }

        let mut body = json!({ "error": self.to_string() });
        if let Some(details) = self.details() {
            body["details"] = Value::String(details);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(internal) = self.internal_details() {
            response.extensions_mut().insert(internal);
        }
        response
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Internal(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::OriginNotAllowed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::PayloadTooLarge("x".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::not_configured("missing", "add it").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let upstream = Error::Upstream {
            status: StatusCode::FORBIDDEN,
            message: "quota".into(),
            details: None,
        };
        assert_eq!(upstream.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_database_cause_stays_off_the_body() {
        let response = Error::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let internal = response.extensions().get::<InternalDetails>().cloned().unwrap();
        assert_eq!(internal.message, "Database error");
        assert!(!internal.details.is_empty());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Database error" }));
    }

    #[test]
    fn test_messages_are_unprefixed() {
        assert_eq!(Error::OriginNotAllowed.to_string(), "Origin not allowed");
        assert_eq!(
            Error::Validation("Code is required".into()).to_string(),
            "Code is required"
        );
        assert_eq!(
            Error::not_configured("Gemini API key is not configured", "hint").to_string(),
            "Gemini API key is not configured"
        );
    }
}
