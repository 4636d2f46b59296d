//! HTTP client for a substrate hosted by `cadence worker`.
//!
//! Worker surface:
//!
//! | Method | Path                                                  | Success |
//! |--------|-------------------------------------------------------|---------|
//! | GET    | `/health`                                             | 200     |
//! | POST   | `/namespaces/{ns}/workflows`                          | 201     |
//! | POST   | `/namespaces/{ns}/workflows/{id}/signals/mutate`      | 202     |
//! | GET    | `/namespaces/{ns}/workflows/{id}/state`               | 200     |
//!
//! Bodies use the same envelope as the public API: results arrive in `data`,
//! failures in `errors[0].message`.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use cadence_core::substrate::SubstrateClient;
use cadence_types::action::Action;
use cadence_types::config::SubstrateConfig;
use cadence_types::error::SubstrateError;
use cadence_types::execution::{ExecutionState, MutateSignal, StartEngineRequest};

/// The parts of the response envelope this client reads.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct RemoteSubstrateClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
}

impl RemoteSubstrateClient {
    pub fn new(
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SubstrateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubstrateError::Unavailable(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
        })
    }

    pub fn from_config(config: &SubstrateConfig) -> Result<Self, SubstrateError> {
        Self::new(
            &config.address,
            &config.namespace,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn workflows_url(&self) -> String {
        format!("{}/namespaces/{}/workflows", self.base_url, self.namespace)
    }

    fn workflow_url(&self, workflow_id: &str, tail: &str) -> String {
        format!("{}/{workflow_id}/{tail}", self.workflows_url())
    }
}

/// Transport failures mean the worker is unreachable.
fn transport(err: reqwest::Error) -> SubstrateError {
    SubstrateError::Unavailable(err.to_string())
}

/// Map a non-success response onto a [`SubstrateError`].
async fn error_from_response(response: Response, workflow_id: Option<&str>) -> SubstrateError {
    let status = response.status();
    let message = response
        .json::<Envelope<serde_json::Value>>()
        .await
        .ok()
        .and_then(|body| body.errors.into_iter().next())
        .map(|e| e.message)
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::NOT_FOUND => {
            SubstrateError::WorkflowNotFound(workflow_id.unwrap_or_default().to_string())
        }
        StatusCode::CONFLICT => {
            SubstrateError::AlreadyStarted(workflow_id.unwrap_or_default().to_string())
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            SubstrateError::Unavailable(message)
        }
        _ => SubstrateError::Rejected(message),
    }
}

impl SubstrateClient for RemoteSubstrateClient {
    async fn start_engine(&self, request: StartEngineRequest) -> Result<(), SubstrateError> {
        let workflow_id = request.workflow_id.clone();
        let response = self
            .http
            .post(self.workflows_url())
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, Some(&workflow_id)).await)
        }
    }

    async fn signal_mutate(&self, workflow_id: &str, actions: Vec<Action>) -> Result<(), SubstrateError> {
        let response = self
            .http
            .post(self.workflow_url(workflow_id, "signals/mutate"))
            .json(&MutateSignal { actions })
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, Some(workflow_id)).await)
        }
    }

    async fn query_state(&self, workflow_id: &str) -> Result<ExecutionState, SubstrateError> {
        let response = self
            .http
            .get(self.workflow_url(workflow_id, "state"))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(error_from_response(response, Some(workflow_id)).await);
        }
        response
            .json::<Envelope<ExecutionState>>()
            .await
            .map_err(|e| SubstrateError::Rejected(format!("invalid state payload: {e}")))?
            .data
            .ok_or_else(|| SubstrateError::Rejected("state response carried no data".to_string()))
    }

    async fn ping(&self) -> Result<(), SubstrateError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SubstrateError::Unavailable(format!(
                "worker health check returned {}",
                response.status()
            )))
        }
    }
}
