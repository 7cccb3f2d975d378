use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    Locked { message: String },

    #[error("{message}")]
    ValidationError { message: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("File too large: {size} bytes exceeds maximum of {max_size} bytes")]
    PayloadTooLarge { size: usize, max_size: usize },

    #[error("Unsupported media type: {message}")]
    UnsupportedMediaType { message: String },

    #[error("{message}")]
    RateLimitError { message: String },

    #[error("{message}")]
    TokenError { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Image processing failed: {message}")]
    ImageProcessingError { message: String },

    #[error("Email delivery failed: {message}")]
    EmailError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

/// JSON body returned for every error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_code: String,
}

pub struct ErrorHandler;

impl ErrorHandler {
    /// Converts an AppError into a status code and client-safe body
    pub fn handle_error(error: &AppError) -> (StatusCode, ErrorResponse) {
        let (status, code) = match error {
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Locked { .. } => (StatusCode::LOCKED, "LOCKED"),
            AppError::ValidationError { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED")
            }
            AppError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            AppError::UnsupportedMediaType { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            AppError::RateLimitError { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::TokenError { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TOKEN"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::StorageError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILED"),
            AppError::ImageProcessingError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "IMAGE_PROCESSING_FAILED")
            }
            AppError::EmailError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "EMAIL_FAILED"),
            AppError::InternalError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // 5xx details stay in the logs
        let detail = if status.is_server_error() {
            "An unexpected error occurred".to_string()
        } else {
            error.to_string()
        };

        (
            status,
            ErrorResponse {
                detail,
                error_code: code.to_string(),
            },
        )
    }

    /// Async retry with exponential backoff for transient failures
    pub async fn retry_async_with_backoff<F, Fut, T, E>(
        operation: F,
        max_attempts: usize,
        initial_delay: Duration,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Debug,
    {
        let mut delay = initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) if attempt >= max_attempts => return Err(error),
                Err(error) => {
                    tracing::warn!(
                        "Async operation failed on attempt {}/{}, retrying in {:?}: {:?}",
                        attempt,
                        max_attempts,
                        delay,
                        error
                    );

                    sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30)); // Cap at 30 seconds
                    attempt += 1;
                }
            }
        }
    }

    /// Determines if an error is retryable
    pub fn is_retryable(error: &AppError) -> bool {
        matches!(
            error,
            AppError::Database(_)
                | AppError::StorageError { .. }
                | AppError::EmailError { .. }
                | AppError::InternalError { .. }
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = ErrorHandler::handle_error(&self);

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}

// Convenience functions for creating specific errors
impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden { message: message.into() }
    }

    pub fn locked(message: impl Into<String>) -> Self {
        AppError::Locked { message: message.into() }
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        AppError::ValidationError { message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest { message: message.into() }
    }

    pub fn unsupported_media(message: impl Into<String>) -> Self {
        AppError::UnsupportedMediaType { message: message.into() }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        AppError::RateLimitError { message: message.into() }
    }

    pub fn token_error(message: impl Into<String>) -> Self {
        AppError::TokenError { message: message.into() }
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        AppError::StorageError { message: message.into() }
    }

    pub fn image_processing_failed(message: impl Into<String>) -> Self {
        AppError::ImageProcessingError { message: message.into() }
    }

    pub fn email_failed(message: impl Into<String>) -> Self {
        AppError::EmailError { message: message.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        AppError::InternalError { message: message.into() }
    }
}
