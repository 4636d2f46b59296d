//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use cadence_types::error::{CadenceError, EnrollmentError, SubstrateError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Cadence(CadenceError),
    Enrollment(EnrollmentError),
    /// Raised by the worker surface.
    Substrate(SubstrateError),
    Validation(String),
}

impl From<CadenceError> for AppError {
    fn from(e: CadenceError) -> Self {
        AppError::Cadence(e)
    }
}

impl From<EnrollmentError> for AppError {
    fn from(e: EnrollmentError) -> Self {
        AppError::Enrollment(e)
    }
}

impl From<SubstrateError> for AppError {
    fn from(e: SubstrateError) -> Self {
        AppError::Substrate(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Cadence(CadenceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "CADENCE_NOT_FOUND")
            }
            AppError::Cadence(CadenceError::Invalid(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Cadence(CadenceError::StorageError(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            AppError::Enrollment(EnrollmentError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "ENROLLMENT_NOT_FOUND")
            }
            AppError::Enrollment(EnrollmentError::CadenceNotFound(_)) => {
                (StatusCode::NOT_FOUND, "CADENCE_NOT_FOUND")
            }
            AppError::Enrollment(EnrollmentError::WorkflowNotFound(_)) => {
                (StatusCode::NOT_FOUND, "WORKFLOW_NOT_FOUND")
            }
            AppError::Enrollment(EnrollmentError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SUBSTRATE_UNAVAILABLE")
            }
            AppError::Enrollment(EnrollmentError::Substrate(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SUBSTRATE_ERROR")
            }
            AppError::Enrollment(EnrollmentError::StorageError(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            AppError::Substrate(SubstrateError::WorkflowNotFound(_)) => {
                (StatusCode::NOT_FOUND, "WORKFLOW_NOT_FOUND")
            }
            AppError::Substrate(SubstrateError::AlreadyStarted(_)) => {
                (StatusCode::CONFLICT, "WORKFLOW_ALREADY_STARTED")
            }
            AppError::Substrate(SubstrateError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SUBSTRATE_UNAVAILABLE")
            }
            AppError::Substrate(SubstrateError::Rejected(_)) => {
                (StatusCode::BAD_REQUEST, "REQUEST_REJECTED")
            }
            AppError::Substrate(SubstrateError::Journal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "JOURNAL_ERROR")
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Cadence(e) => e.to_string(),
            AppError::Enrollment(e) => e.to_string(),
            AppError::Substrate(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(code, message = message.as_str(), "request failed");
        }
        (status, Json(ApiResponse::error(code, &message))).into_response()
    }
}
