use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::assessment_client::ProviderError;
use crate::directory_client::DirectoryError;
use crate::exam::flow::FlowError;
use crate::exam::question_state::QuestionStateError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Assessment service error: {0}")]
    Assessment(#[from] ProviderError),

    #[error("Directory service error: {0}")]
    Directory(#[from] DirectoryError),
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Question(e) => match e {
                QuestionStateError::UnknownQuestion(_) => {
                    AppError::NotFound(e.to_string())
                }
                _ => AppError::Validation(e.to_string()),
            },
            FlowError::InvalidRating(_) => AppError::Validation(err.to_string()),
            FlowError::NotActive(_)
            | FlowError::Busy
            | FlowError::TestComplete
            | FlowError::NotComplete
            | FlowError::FeedbackAlreadySubmitted => AppError::Conflict(err.to_string()),
            FlowError::NoLibrary => AppError::NotFound(err.to_string()),
            FlowError::Provider(e) => AppError::Assessment(e),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Assessment(e) => {
                tracing::error!("Assessment service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ASSESSMENT_SERVICE_ERROR",
                    e.to_string(),
                )
            }
            AppError::Directory(e) => {
                tracing::error!("Directory service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "DIRECTORY_SERVICE_ERROR",
                    "The directory service could not be reached".to_string(),
                )
            }
        }
    }
}

/// Rejects ids that are forwarded as a path segment to another service but
/// cannot stand for one: blank values and the dot segments `.` and `..`.
pub fn require_segment(field: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    if value == "." || value == ".." {
        return Err(AppError::Validation(format!("{field} is not a valid identifier")));
    }
    Ok(())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
