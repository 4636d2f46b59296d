//! Substrate connection manager.
//!
//! Owns the answer to "can we reach the substrate right now?". The state
//! lives in a `watch` channel; consumers read it, the background loop and
//! [`ConnectionManager::report_failure`] write it.
//!
//! ```text
//! DISCONNECTED --attempt--> CONNECTING --ping ok--> CONNECTED
//!      ^                        |                       |
//!      +------ping failed-------+----transport error----+
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

use cadence_types::error::SubstrateError;

use super::SubstrateClient;

/// Link state between this process and the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Connecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
        }
    }
}

/// State plus the most recent failure, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub detail: Option<String>,
}

/// Tracks substrate reachability and reconnects in the background.
#[derive(Debug)]
pub struct ConnectionManager {
    status: watch::Sender<ConnectionStatus>,
    wake: Notify,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    /// A manager that starts DISCONNECTED.
    pub fn new() -> Self {
        let (status, _) = watch::channel(ConnectionStatus {
            state: ConnectionState::Disconnected,
            detail: Some("not connected yet".to_string()),
        });
        Self {
            status,
            wake: Notify::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Human-readable reason the link is not up.
    pub fn detail(&self) -> String {
        let status = self.status.borrow();
        match (&status.state, &status.detail) {
            (ConnectionState::Connected, _) => "connected".to_string(),
            (state, Some(detail)) => format!("substrate is {state}: {detail}"),
            (state, None) => format!("substrate is {state}"),
        }
    }

    /// Record the outcome of a substrate call.
    ///
    /// Only transport failures flip the state; a `WorkflowNotFound` proves
    /// the link works.
    pub fn report_failure(&self, error: &SubstrateError) {
        if !error.is_unavailable() {
            return;
        }
        let was_connected = self.is_connected();
        self.set(ConnectionState::Disconnected, Some(error.to_string()));
        if was_connected {
            tracing::warn!(error = %error, "lost connection to substrate");
        }
        self.wake.notify_one();
    }

    /// One connection attempt: CONNECTING, then CONNECTED or DISCONNECTED.
    pub async fn connect<S: SubstrateClient>(&self, client: &S) -> bool {
        let was_connected = self.is_connected();
        if !was_connected {
            self.set(ConnectionState::Connecting, None);
        }

        match client.ping().await {
            Ok(()) => {
                self.set(ConnectionState::Connected, None);
                if !was_connected {
                    tracing::info!("connected to substrate");
                }
                true
            }
            Err(err) => {
                self.set(ConnectionState::Disconnected, Some(err.to_string()));
                if was_connected {
                    tracing::warn!(error = %err, "substrate health check failed");
                } else {
                    tracing::debug!(error = %err, "substrate connection attempt failed");
                }
                false
            }
        }
    }

    /// Spawn the background loop: one attempt per `interval` (or sooner after
    /// a reported failure) until `cancel` fires.
    pub fn spawn<S: SubstrateClient + 'static>(
        self: &Arc<Self>,
        client: Arc<S>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                manager.connect(client.as_ref()).await;

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                    _ = manager.wake.notified() => {
                        // a failure was just observed; give the substrate one interval
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(interval) => {}
                        }
                    }
                }
            }
            tracing::debug!("substrate connection loop stopped");
        })
    }

    fn set(&self, state: ConnectionState, detail: Option<String>) {
        self.status.send_replace(ConnectionStatus { state, detail });
    }
}
