/// Error types for Post Service
///
/// `RepositoryError` is what storage backends report. `PostError` is what the
/// post manager hands to the delivery layer: the `NotFound` sentinel stays
/// distinguishable from every other failure and maps to HTTP 404.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::time::Duration;
use thiserror::Error;

/// Result type for post-service operations
pub type Result<T> = std::result::Result<T, PostError>;

/// Storage backend failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The post disappeared between the caller's read and this write
    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Failed to decode stored post: {0}")]
    Decode(String),
}

/// Post manager errors
#[derive(Debug, Error)]
pub enum PostError {
    /// Resource not found
    #[error("Item not found")]
    NotFound,

    /// Malformed creation input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure, wrapped with a description of the failed step
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PostError::NotFound)
    }
}

impl From<validator::ValidationErrors> for PostError {
    fn from(errors: validator::ValidationErrors) -> Self {
        PostError::Validation(errors.to_string())
    }
}

impl ResponseError for PostError {
    fn status_code(&self) -> StatusCode {
        match self {
            PostError::NotFound => StatusCode::NOT_FOUND,
            PostError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}
