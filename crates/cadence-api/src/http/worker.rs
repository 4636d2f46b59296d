//! Substrate surface served by `cadence worker`.
//!
//! Exposes a [`LocalSubstrate`](cadence_infra::substrate::LocalSubstrate) to
//! API servers running in remote mode. Paths are scoped by namespace; a
//! request for another namespace is rejected.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use cadence_core::substrate::SubstrateClient;
use cadence_types::error::SubstrateError;
use cadence_types::execution::{ExecutionState, MutateSignal, StartEngineRequest};

use crate::http::error::AppError;
use crate::http::extract::ApiJson;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::EmbeddedSubstrate;

#[derive(Clone)]
pub struct WorkerState {
    pub substrate: Arc<EmbeddedSubstrate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerHealth {
    pub status: &'static str,
    pub namespace: String,
    pub task_queue: String,
    pub instances: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAccepted {
    pub workflow_id: String,
}

pub fn build_worker_router(substrate: Arc<EmbeddedSubstrate>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/namespaces/{ns}/workflows", post(start_workflow))
        .route(
            "/namespaces/{ns}/workflows/{id}/signals/mutate",
            post(signal_mutate),
        )
        .route("/namespaces/{ns}/workflows/{id}/state", get(query_state))
        .layer(TraceLayer::new_for_http())
        .with_state(WorkerState { substrate })
}

fn check_namespace(state: &WorkerState, namespace: &str) -> Result<(), AppError> {
    if namespace == state.substrate.namespace() {
        Ok(())
    } else {
        Err(SubstrateError::Rejected(format!(
            "namespace '{namespace}' is not served here"
        ))
        .into())
    }
}

/// GET /health - 503 once the substrate is shutting down.
async fn health(
    State(state): State<WorkerState>,
) -> Result<Json<WorkerHealth>, AppError> {
    state.substrate.ping().await?;
    Ok(Json(WorkerHealth {
        status: "ok",
        namespace: state.substrate.namespace().to_string(),
        task_queue: state.substrate.task_queue().to_string(),
        instances: state.substrate.instance_count(),
    }))
}

/// POST /namespaces/{ns}/workflows
async fn start_workflow(
    State(state): State<WorkerState>,
    Path(namespace): Path<String>,
    ApiJson(request): ApiJson<StartEngineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkflowAccepted>>), AppError> {
    check_namespace(&state, &namespace)?;
    let timer = RequestTimer::start();
    let workflow_id = request.workflow_id.clone();
    state.substrate.start_engine(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(timer.finish(WorkflowAccepted { workflow_id })),
    ))
}

/// POST /namespaces/{ns}/workflows/{id}/signals/mutate
async fn signal_mutate(
    State(state): State<WorkerState>,
    Path((namespace, workflow_id)): Path<(String, String)>,
    ApiJson(signal): ApiJson<MutateSignal>,
) -> Result<(StatusCode, Json<ApiResponse<WorkflowAccepted>>), AppError> {
    check_namespace(&state, &namespace)?;
    let timer = RequestTimer::start();
    state
        .substrate
        .signal_mutate(&workflow_id, signal.actions)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(timer.finish(WorkflowAccepted { workflow_id })),
    ))
}

/// GET /namespaces/{ns}/workflows/{id}/state
async fn query_state(
    State(state): State<WorkerState>,
    Path((namespace, workflow_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ExecutionState>>, AppError> {
    check_namespace(&state, &namespace)?;
    let timer = RequestTimer::start();
    let execution = state.substrate.query_state(&workflow_id).await?;
    Ok(Json(timer.finish(execution)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cadence_infra::substrate::RemoteSubstrateClient;
    use cadence_types::action::Action;
    use cadence_types::config::GlobalConfig;
    use cadence_types::execution::{EngineInput, ExecutionStatus};
    use tempfile::TempDir;

    use super::*;
    use crate::state::open_embedded_substrate;

    /// Serve a worker on an ephemeral port and return a client for it.
    async fn worker(dir: &TempDir) -> (Arc<EmbeddedSubstrate>, RemoteSubstrateClient) {
        let config = GlobalConfig::default();
        let substrate = Arc::new(open_embedded_substrate(&config, dir.path()).await.unwrap());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_worker_router(Arc::clone(&substrate));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = RemoteSubstrateClient::new(
            format!("http://{addr}"),
            &config.substrate.namespace,
            Duration::from_secs(5),
        )
        .unwrap();
        (substrate, client)
    }

    fn start(workflow_id: &str) -> StartEngineRequest {
        StartEngineRequest {
            workflow_id: workflow_id.to_string(),
            task_queue: "cadence-task-queue".to_string(),
            input: EngineInput {
                actions: vec![Action::send("s1", "Welcome", "Hello"), Action::wait("w1", 60)],
                subject_contact: "ada@example.com".to_string(),
                definition_id: "cad_1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn remote_client_drives_worker() {
        let dir = TempDir::new().unwrap();
        let (_substrate, client) = worker(&dir).await;

        client.ping().await.unwrap();
        client.start_engine(start("wf-1")).await.unwrap();
        assert_eq!(
            client.start_engine(start("wf-1")).await.unwrap_err(),
            SubstrateError::AlreadyStarted("wf-1".to_string())
        );

        client
            .signal_mutate("wf-1", vec![Action::send("n1", "New", "")])
            .await
            .unwrap();

        let mut state = client.query_state("wf-1").await.unwrap();
        for _ in 0..100 {
            if state.status == ExecutionStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            state = client.query_state("wf-1").await.unwrap();
        }
        assert_eq!(state.status, ExecutionStatus::Completed);
        assert_eq!(state.version, 2);

        assert_eq!(
            client.query_state("wf-missing").await.unwrap_err(),
            SubstrateError::WorkflowNotFound("wf-missing".to_string())
        );
    }

    #[tokio::test]
    async fn foreign_namespace_and_queue_are_rejected() {
        let dir = TempDir::new().unwrap();
        let (substrate, client) = worker(&dir).await;

        let mut foreign_queue = start("wf-2");
        foreign_queue.task_queue = "elsewhere".to_string();
        assert!(matches!(
            client.start_engine(foreign_queue).await,
            Err(SubstrateError::Rejected(_))
        ));

        let other_ns = RemoteSubstrateClient::new(
            client.base_url(),
            "staging",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            other_ns.start_engine(start("wf-3")).await,
            Err(SubstrateError::Rejected(_))
        ));
        assert_eq!(substrate.instance_count(), 0);
    }

    #[tokio::test]
    async fn health_fails_after_shutdown() {
        let dir = TempDir::new().unwrap();
        let (substrate, client) = worker(&dir).await;
        substrate.shutdown().await;
        assert!(client.ping().await.unwrap_err().is_unavailable());
    }
}
