//! Request extractors.

use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;

use crate::http::error::AppError;

/// JSON body whose parse failures are reported as `VALIDATION_ERROR`
/// envelopes instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
