//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::artifact_service::ArtifactError;
use crate::service::job_service::JobError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(_) => ApiError::NotFound(err.to_string()),
            JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            JobError::Repository(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Forbidden(msg) => ApiError::Forbidden(msg),
            ArtifactError::NotFound(msg) => ApiError::NotFound(msg),
            ArtifactError::Repository(err) => ApiError::InternalError(err.to_string()),
            ArtifactError::Io(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
