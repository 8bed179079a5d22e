//! Helper types and traits for cleaner route handlers.
//!
//! Provides a JSON error type and extension traits for converting `Option`
//! and `Result` types into HTTP-appropriate error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use epub_translator_core::Error;
use serde_json::json;
use tracing::error;

/// Error returned by route handlers, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
#[error("{detail}")]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::ChunkOutOfRange { total, .. } => Self::bad_request(format!(
                "Invalid chunk number. Please provide a number between 1 and {total}."
            )),
            Error::TranslationUnsupportedLanguage(_) => Self::unprocessable(e.to_string()),
            e if e.is_invalid_input() => Self::bad_request(e.to_string()),
            e => Self::internal(e.to_string()),
        }
    }
}

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
///
/// Provides convenient methods for returning 404 Not Found when
/// an expected resource (like a scanned book) doesn't exist.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| ApiError::not_found(msg))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| ApiError::internal(e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| ApiError::bad_request(e.to_string()))
    }
}
