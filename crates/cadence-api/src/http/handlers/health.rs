//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use cadence_core::substrate::ConnectionState;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub substrate: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: &'static str,
}

/// GET /health - Process liveness plus the substrate connection state.
///
/// Always 200: a disconnected substrate degrades enrollment calls but the
/// API itself is up.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let status = state.connection().status();
    Json(HealthReport {
        status: "ok",
        substrate: status.state,
        detail: status.detail,
        version: env!("CARGO_PKG_VERSION"),
    })
}
