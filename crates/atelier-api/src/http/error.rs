//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use atelier_types::error::{FileError, ProjectError, WorkflowError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Project(ProjectError),
    Workflow(WorkflowError),
    /// Authentication failure.
    Unauthorized(String),
    /// Malformed request input not covered by a domain error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ProjectError> for AppError {
    fn from(e: ProjectError) -> Self {
        AppError::Project(e)
    }
}

impl From<FileError> for AppError {
    fn from(e: FileError) -> Self {
        AppError::Project(ProjectError::File(e))
    }
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and optional structured details.
    fn classify(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Project(e) => match e {
                ProjectError::NotFound => (StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND", None),
                ProjectError::InvalidName(_) | ProjectError::InvalidRequirement(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None)
                }
                ProjectError::Busy => (StatusCode::CONFLICT, "PROJECT_BUSY", None),
                ProjectError::StorageError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", None)
                }
                ProjectError::File(e) => match e {
                    FileError::NotFound(_) => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND", None),
                    FileError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "INVALID_PATH", None),
                    FileError::NotText(_) => (StatusCode::BAD_REQUEST, "NOT_TEXT", None),
                    FileError::TooLarge { size, max } => (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "FILE_TOO_LARGE",
                        Some(json!({ "size": size, "max": max })),
                    ),
                    FileError::Conflict { expected, actual } => (
                        StatusCode::CONFLICT,
                        "FILE_CONFLICT",
                        Some(json!({ "expected_hash": expected, "current_hash": actual })),
                    ),
                    FileError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", None),
                },
            },
            AppError::Workflow(e) => match e {
                WorkflowError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND", None)
                }
                WorkflowError::AlreadyRunning => (StatusCode::CONFLICT, "WORKFLOW_RUNNING", None),
                WorkflowError::AlreadyCompleted => {
                    (StatusCode::CONFLICT, "WORKFLOW_COMPLETED", None)
                }
                WorkflowError::NotRunning => (StatusCode::CONFLICT, "WORKFLOW_NOT_RUNNING", None),
                WorkflowError::StepTimeout { .. }
                | WorkflowError::StepFailed { .. }
                | WorkflowError::StorageError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "WORKFLOW_ERROR", None)
                }
            },
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Project(e) => e.to_string(),
            AppError::Workflow(e) => e.to_string(),
            AppError::Unauthorized(msg) | AppError::Validation(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.classify();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        } else {
            tracing::debug!(code, status = status.as_u16(), error = %message, "request rejected");
        }

        let body = ApiResponse::error(code, &message, details, uuid::Uuid::now_v7().to_string(), 0);
        (status, Json(body)).into_response()
    }
}
