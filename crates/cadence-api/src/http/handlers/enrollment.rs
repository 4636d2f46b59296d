//! Enrollment handlers: enroll a contact, read live status, replace steps.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use cadence_types::enrollment::{
    CreateEnrollmentRequest, Enrollment, EnrollmentStatusView, MutationAck,
    UpdateEnrollmentCadenceRequest,
};

use crate::http::error::AppError;
use crate::http::extract::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/enrollments - Start an engine for a contact.
pub async fn create_enrollment(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Enrollment>>), AppError> {
    if body.contact_email.trim().is_empty() {
        return Err(AppError::Validation("contactEmail must not be empty".to_string()));
    }

    let timer = RequestTimer::start();
    let enrollment = state.coordinator.enroll(body).await?;
    let link = format!("/api/v1/enrollments/{}", enrollment.id);
    let cadence = format!("/api/v1/cadences/{}", enrollment.cadence_id);

    Ok((
        StatusCode::CREATED,
        Json(
            timer
                .finish(enrollment)
                .with_link("self", &link)
                .with_link("cadence", &cadence),
        ),
    ))
}

/// GET /api/v1/enrollments/{id} - Enrollment with its engine's live state.
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EnrollmentStatusView>>, AppError> {
    let timer = RequestTimer::start();
    let view = state.coordinator.status(&id).await?;

    Ok(Json(
        timer
            .finish(view)
            .with_link("self", &format!("/api/v1/enrollments/{id}")),
    ))
}

/// POST /api/v1/enrollments/{id}/update-cadence - Replace the running steps.
pub async fn update_enrollment_cadence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateEnrollmentCadenceRequest>,
) -> Result<Json<ApiResponse<MutationAck>>, AppError> {
    let timer = RequestTimer::start();
    let ack = state.coordinator.update_cadence(&id, body.steps).await?;

    Ok(Json(
        timer
            .finish(ack)
            .with_link("enrollment", &format!("/api/v1/enrollments/{id}")),
    ))
}
