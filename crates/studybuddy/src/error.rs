//! Error types for the StudyBuddy core

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::ai::ModelOutputError;

/// Result type alias for StudyBuddy operations
pub type StudyResult<T> = Result<T, StudyError>;

/// StudyBuddy error types
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Free plan limit reached for {resource}. Upgrade to create more.")]
    LimitReached { resource: String },

    /// Also returned when the resource exists but belongs to another user
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{0}")]
    Conflict(String),

    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error("AI response error: {0}")]
    ModelOutput(#[from] ModelOutputError),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("File processing error: {0}")]
    Extraction(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        StudyError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StudyError::Validation(message.into())
    }

    /// API error code
    pub fn code(&self) -> &'static str {
        match self {
            StudyError::Validation(_) => "VALIDATION_ERROR",
            StudyError::Unauthorized(_) => "UNAUTHORIZED",
            StudyError::LimitReached { .. } => "LIMIT_REACHED",
            StudyError::NotFound { .. } => "NOT_FOUND",
            StudyError::Conflict(_) => "CONFLICT",
            StudyError::NotConfigured(_) => "NOT_CONFIGURED",
            StudyError::ModelOutput(ModelOutputError::Parse(_)) => "AI_PARSE_ERROR",
            StudyError::ModelOutput(ModelOutputError::Validation(_)) => "AI_INVALID_FORMAT",
            StudyError::Upstream(_) => "UPSTREAM_ERROR",
            StudyError::Extraction(_) => "FILE_PROCESSING_ERROR",
            StudyError::Database(_) => "DATABASE_ERROR",
            StudyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            StudyError::Validation(_) => StatusCode::BAD_REQUEST,
            StudyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StudyError::LimitReached { .. } => StatusCode::FORBIDDEN,
            StudyError::NotFound { .. } => StatusCode::NOT_FOUND,
            StudyError::Conflict(_) => StatusCode::CONFLICT,

            StudyError::NotConfigured(_)
            | StudyError::ModelOutput(_)
            | StudyError::Upstream(_)
            | StudyError::Extraction(_)
            | StudyError::Database(_)
            | StudyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server-side failures get a generic text,
    /// the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            StudyError::NotConfigured(_) => "Server is missing required configuration".to_string(),
            StudyError::ModelOutput(ModelOutputError::Parse(_)) => {
                "Failed to parse AI response".to_string()
            }
            StudyError::ModelOutput(ModelOutputError::Validation(_)) => {
                "AI response had an invalid format".to_string()
            }
            StudyError::Upstream(_) => "External service request failed".to_string(),
            StudyError::Extraction(_) => "Failed to process file".to_string(),
            StudyError::Database(_) | StudyError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for StudyError {
    fn from(err: mongodb::error::Error) -> Self {
        StudyError::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for StudyError {
    fn from(err: bson::ser::Error) -> Self {
        StudyError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        StudyError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for StudyError {
    fn from(err: reqwest::Error) -> Self {
        StudyError::Upstream(err.to_string())
    }
}

/// API error body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl IntoResponse for StudyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }
        let body = ApiError {
            error: self.public_message(),
            code: self.code().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
