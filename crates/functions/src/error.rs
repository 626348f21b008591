//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All function handlers return `Result<T, AppError>`.
//! Failures are rendered as JSON `{"error", "kind"}` bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use charsheet_core::{ApiError, ApiErrorKind};

use crate::db::RepositoryError;

/// Application-level error type for the functions server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Classification sent to clients.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Repository(_) => ApiErrorKind::Internal,
            Self::NotFound(_) => ApiErrorKind::NotFound,
            Self::BadRequest(_) => ApiErrorKind::BadRequest,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Repository(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Function error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Repository(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = ApiError {
            error: message,
            kind: self.kind(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, ApiError) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("character abc".to_string());
        assert_eq!(err.to_string(), "Not found: character abc");

        let err = AppError::BadRequest("invalid json".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid json");
    }

    #[tokio::test]
    async fn test_app_error_bodies() {
        let (status, body) = body_of(AppError::NotFound("character abc".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.kind, ApiErrorKind::NotFound);

        let (status, body) = body_of(AppError::BadRequest("bad".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.kind, ApiErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::Repository(RepositoryError::DataCorruption(
            "row 7 has a bad id".to_string(),
        ));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.kind, ApiErrorKind::Internal);
        assert_eq!(body.error, "Internal server error");
    }
}
