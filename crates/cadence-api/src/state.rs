//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the REST API.
//! Services are generic over repository and substrate traits; AppState pins
//! them to the in-memory stores and to whichever substrate the server was
//! started with.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::event::EventBus;
use cadence_core::service::cadence::CadenceService;
use cadence_core::service::enrollment::EnrollmentCoordinator;
use cadence_core::substrate::{ConnectionManager, SubstrateClient};
use cadence_infra::mailer::LogMailer;
use cadence_infra::memory::{InMemoryCadenceRepository, InMemoryEnrollmentRepository};
use cadence_infra::sqlite::pool::database_url;
use cadence_infra::sqlite::{DatabasePool, SqliteHistoryRepository};
use cadence_infra::substrate::{LocalSubstrate, LocalSubstrateConfig, RemoteSubstrateClient};
use cadence_types::action::Action;
use cadence_types::config::GlobalConfig;
use cadence_types::error::SubstrateError;
use cadence_types::execution::{ExecutionState, StartEngineRequest};

/// Substrate hosted in this process, journaled to SQLite.
pub type EmbeddedSubstrate = LocalSubstrate<SqliteHistoryRepository, LogMailer>;

/// The substrate a server talks to, chosen at startup.
pub enum AnySubstrate {
    Embedded(EmbeddedSubstrate),
    Remote(RemoteSubstrateClient),
}

impl SubstrateClient for AnySubstrate {
    async fn start_engine(&self, request: StartEngineRequest) -> Result<(), SubstrateError> {
        match self {
            AnySubstrate::Embedded(s) => s.start_engine(request).await,
            AnySubstrate::Remote(s) => s.start_engine(request).await,
        }
    }

    async fn signal_mutate(&self, workflow_id: &str, actions: Vec<Action>) -> Result<(), SubstrateError> {
        match self {
            AnySubstrate::Embedded(s) => s.signal_mutate(workflow_id, actions).await,
            AnySubstrate::Remote(s) => s.signal_mutate(workflow_id, actions).await,
        }
    }

    async fn query_state(&self, workflow_id: &str) -> Result<ExecutionState, SubstrateError> {
        match self {
            AnySubstrate::Embedded(s) => s.query_state(workflow_id).await,
            AnySubstrate::Remote(s) => s.query_state(workflow_id).await,
        }
    }

    async fn ping(&self) -> Result<(), SubstrateError> {
        match self {
            AnySubstrate::Embedded(s) => s.ping().await,
            AnySubstrate::Remote(s) => s.ping().await,
        }
    }
}

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteCadenceService = CadenceService<InMemoryCadenceRepository>;

pub type ConcreteCoordinator = EnrollmentCoordinator<
    InMemoryCadenceRepository,
    InMemoryEnrollmentRepository,
    Arc<AnySubstrate>,
>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub cadence_service: Arc<ConcreteCadenceService>,
    pub coordinator: Arc<ConcreteCoordinator>,
}

impl AppState {
    /// Wire the services around `substrate`. Definitions and enrollments live
    /// in memory for the lifetime of the process.
    pub fn new(
        substrate: Arc<AnySubstrate>,
        connection: Arc<ConnectionManager>,
        task_queue: &str,
    ) -> Self {
        let cadences = InMemoryCadenceRepository::new();
        let coordinator = EnrollmentCoordinator::new(
            cadences.clone(),
            InMemoryEnrollmentRepository::new(),
            substrate,
            connection,
            task_queue,
        );

        Self {
            cadence_service: Arc::new(CadenceService::new(cadences)),
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        self.coordinator.connection()
    }
}

/// Open the SQLite journal in `data_dir` and host a substrate on it,
/// recovering every workflow whose journal is still open.
///
/// The database is opened with bounded retries (`worker.connect_*`).
pub async fn open_embedded_substrate(
    config: &GlobalConfig,
    data_dir: &Path,
) -> anyhow::Result<EmbeddedSubstrate> {
    tokio::fs::create_dir_all(data_dir).await?;

    let pool = DatabasePool::connect_with_retry(
        &database_url(data_dir),
        config.worker.connect_max_attempts,
        Duration::from_secs(config.worker.connect_retry_delay_secs),
    )
    .await?;

    let substrate = LocalSubstrate::new(
        SqliteHistoryRepository::new(pool),
        LogMailer::new(),
        LocalSubstrateConfig::from_config(config),
        EventBus::default(),
    );
    log_engine_events(substrate.bus());

    let recovered = substrate.recover().await?;
    tracing::info!(
        namespace = substrate.namespace(),
        task_queue = substrate.task_queue(),
        recovered,
        "substrate ready"
    );
    Ok(substrate)
}

/// Mirror bus events into the log until the bus is dropped.
fn log_engine_events(bus: &EventBus) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(
                    workflow_id = event.workflow_id(),
                    event = ?event,
                    "engine event"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "engine event log lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
