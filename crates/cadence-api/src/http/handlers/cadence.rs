//! Cadence definition CRUD handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use cadence_types::cadence::{Cadence, CreateCadenceRequest, UpdateCadenceRequest};

use crate::http::error::AppError;
use crate::http::extract::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

fn cadence_link(id: &str) -> String {
    format!("/api/v1/cadences/{id}")
}

/// POST /api/v1/cadences - Create a cadence definition.
pub async fn create_cadence(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCadenceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Cadence>>), AppError> {
    let timer = RequestTimer::start();
    let cadence = state.cadence_service.create(body).await?;
    let link = cadence_link(&cadence.id);

    Ok((StatusCode::CREATED, Json(timer.finish(cadence).with_link("self", &link))))
}

/// GET /api/v1/cadences - List cadence definitions.
pub async fn list_cadences(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Cadence>>>, AppError> {
    let timer = RequestTimer::start();
    let cadences = state.cadence_service.list().await?;

    Ok(Json(timer.finish(cadences).with_link("self", "/api/v1/cadences")))
}

/// GET /api/v1/cadences/{id}
pub async fn get_cadence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Cadence>>, AppError> {
    let timer = RequestTimer::start();
    let cadence = state.cadence_service.get(&id).await?;

    Ok(Json(timer.finish(cadence).with_link("self", &cadence_link(&id))))
}

/// PUT /api/v1/cadences/{id} - Replace the provided fields. Running
/// enrollments keep the steps they were started with.
pub async fn update_cadence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateCadenceRequest>,
) -> Result<Json<ApiResponse<Cadence>>, AppError> {
    let timer = RequestTimer::start();
    let cadence = state.cadence_service.update(&id, body).await?;

    Ok(Json(timer.finish(cadence).with_link("self", &cadence_link(&id))))
}

/// DELETE /api/v1/cadences/{id}
pub async fn delete_cadence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.cadence_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
