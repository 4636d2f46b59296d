//! In-process durable-execution substrate.
//!
//! Hosts each engine instance as a tokio task. Signals reach an instance
//! through its own mpsc inbox, queries read the `watch` snapshot the instance
//! publishes after every committed transition, and every transition is
//! appended to the workflow journal before it becomes visible.
//!
//! # Durability
//!
//! - `start_engine` journals `WorkflowStarted` before spawning.
//! - `signal_mutate` journals `SignalReceived` before enqueueing.
//! - The run loop journals each step through [`LocalContext::commit`].
//! - A wait step journals `TimerStarted` with its absolute deadline.
//!
//! [`LocalSubstrate::recover`] replays every open journal and respawns the
//! instance at its journaled cursor and version, re-queues unapplied signals
//! and resumes an armed timer against its original deadline.
//!
//! Only live instances are held in memory. Once an instance completes or
//! fails it is dropped, and queries and signals for it are answered from
//! its journal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use cadence_core::engine::context::{
    EngineContext, EngineError, MessageSender, Signal, TimerRequest, WaitOutcome,
};
use cadence_core::engine::machine::CadenceMachine;
use cadence_core::engine::replay::{ActiveTimer, ReplayState, Terminal, replay};
use cadence_core::engine::retry::{RetryPolicy, deliver_with_retry};
use cadence_core::engine::runner::run_cadence;
use cadence_core::event::EventBus;
use cadence_core::repository::history::HistoryRepository;
use cadence_core::substrate::SubstrateClient;
use cadence_types::action::Action;
use cadence_types::config::GlobalConfig;
use cadence_types::error::{RepositoryError, SubstrateError};
use cadence_types::event::CadenceEvent;
use cadence_types::execution::{
    ExecutionState, SendReceipt, SendRequest, StartEngineRequest,
};
use cadence_types::history::HistoryEvent;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Identity and policy of a local substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSubstrateConfig {
    pub namespace: String,
    /// Only start requests for this queue are accepted.
    pub task_queue: String,
    pub retry: RetryPolicy,
}

impl LocalSubstrateConfig {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            namespace: config.substrate.namespace.clone(),
            task_queue: config.substrate.task_queue.clone(),
            retry: RetryPolicy::from_config(&config.worker),
        }
    }
}

impl Default for LocalSubstrateConfig {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default())
    }
}

// ---------------------------------------------------------------------------
// LocalSubstrate
// ---------------------------------------------------------------------------

/// A running engine instance as seen from outside its task.
struct Instance {
    state: watch::Receiver<ExecutionState>,
    inbox: Mutex<Inbox>,
}

struct Inbox {
    next_seq: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

struct Inner<H, M> {
    history: Arc<H>,
    sender: Arc<M>,
    bus: EventBus,
    config: LocalSubstrateConfig,
    instances: Arc<DashMap<String, Arc<Instance>>>,
    tasks: Mutex<JoinSet<()>>,
    cancel: CancellationToken,
}

/// Journal-backed substrate hosting engines in this process.
///
/// Cloning shares the same instances, journal and shutdown token.
pub struct LocalSubstrate<H, M> {
    inner: Arc<Inner<H, M>>,
}

impl<H, M> Clone for LocalSubstrate<H, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, M> LocalSubstrate<H, M>
where
    H: HistoryRepository + 'static,
    M: MessageSender,
{
    pub fn new(history: H, sender: M, config: LocalSubstrateConfig, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                history: Arc::new(history),
                sender: Arc::new(sender),
                bus,
                config,
                instances: Arc::new(DashMap::new()),
                tasks: Mutex::new(JoinSet::new()),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }

    pub fn task_queue(&self) -> &str {
        &self.inner.config.task_queue
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Number of instances currently running in this process.
    pub fn instance_count(&self) -> usize {
        self.inner.instances.len()
    }

    /// Respawn every workflow whose journal is still open.
    ///
    /// Returns the number of recovered instances. Journals that fail to
    /// replay are logged and skipped.
    pub async fn recover(&self) -> Result<usize, SubstrateError> {
        let open = self.inner.history.list_open_workflows().await.map_err(journal)?;
        let mut recovered = 0;

        for workflow_id in open {
            if self.inner.instances.contains_key(&workflow_id) {
                continue;
            }
            let records = self.inner.history.load(&workflow_id).await.map_err(journal)?;
            match replay(&workflow_id, records.into_iter().map(|r| r.event)) {
                Ok(state) => {
                    tracing::info!(
                        workflow_id = workflow_id.as_str(),
                        cursor = state.machine.state().cursor,
                        version = state.machine.state().version,
                        pending_signals = state.pending_signals.len(),
                        "recovering workflow"
                    );
                    self.spawn_instance(workflow_id, state, true).await;
                    recovered += 1;
                }
                Err(err) => {
                    tracing::error!(
                        workflow_id = workflow_id.as_str(),
                        error = %err,
                        "journal replay failed, workflow not recovered"
                    );
                }
            }
        }

        Ok(recovered)
    }

    /// Stop every instance and wait for their tasks. Journals are untouched,
    /// so a later [`recover`](Self::recover) picks the workflows up again.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut tasks = self.inner.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
        tracing::info!(namespace = self.namespace(), "substrate stopped");
    }

    async fn spawn_instance(&self, workflow_id: String, replayed: ReplayState, recovered: bool) {
        let ReplayState {
            machine,
            pending_signals,
            active_timer,
            next_signal_seq,
            ..
        } = replayed;

        let (tx, rx) = mpsc::unbounded_channel();
        for signal in pending_signals {
            // receiver is alive, send cannot fail
            let _ = tx.send(signal);
        }
        let (state_tx, state_rx) = watch::channel(machine.snapshot());

        self.inner.instances.insert(
            workflow_id.clone(),
            Arc::new(Instance {
                state: state_rx,
                inbox: Mutex::new(Inbox {
                    next_seq: next_signal_seq,
                    tx,
                }),
            }),
        );

        self.inner.bus.publish(CadenceEvent::EngineStarted {
            workflow_id: workflow_id.clone(),
            steps: machine.state().actions.len(),
            recovered,
        });

        let mut ctx = LocalContext {
            workflow_id: workflow_id.clone(),
            signals: rx,
            history: Arc::clone(&self.inner.history),
            sender: Arc::clone(&self.inner.sender),
            retry: self.inner.config.retry,
            state_tx,
            resumed_timer: active_timer,
        };
        let history = Arc::clone(&self.inner.history);
        let instances = Arc::clone(&self.inner.instances);
        let bus = self.inner.bus.clone();
        let cancel = self.inner.cancel.clone();

        let mut tasks = self.inner.tasks.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(workflow_id = workflow_id.as_str(), "engine suspended for shutdown");
                }
                result = run_cadence(&mut ctx, machine, &bus) => {
                    if let Err(err) = result {
                        fail_workflow(history.as_ref(), &bus, &workflow_id, &err).await;
                    }
                }
            }
            instances.remove(&workflow_id);
        });
    }

    /// Replay the journal of a workflow not hosted in memory.
    async fn replay_journal(&self, workflow_id: &str) -> Result<ReplayState, SubstrateError> {
        let records = self.inner.history.load(workflow_id).await.map_err(journal)?;
        if records.is_empty() {
            return Err(SubstrateError::WorkflowNotFound(workflow_id.to_string()));
        }
        replay(workflow_id, records.into_iter().map(|r| r.event))
            .map_err(|e| SubstrateError::Journal(e.to_string()))
    }

    /// Answer a signal for a workflow that is not hosted in memory.
    async fn signal_journal(&self, workflow_id: &str) -> Result<(), SubstrateError> {
        match self.replay_journal(workflow_id).await?.terminal {
            Some(Terminal::Completed) => {
                tracing::debug!(workflow_id, "signal to completed workflow ignored");
                Ok(())
            }
            Some(Terminal::Failed(error)) => Err(SubstrateError::Rejected(format!(
                "workflow {workflow_id} failed: {error}"
            ))),
            None => Err(SubstrateError::Rejected(format!(
                "workflow {workflow_id} is not running here"
            ))),
        }
    }

    fn ensure_running(&self) -> Result<(), SubstrateError> {
        if self.inner.cancel.is_cancelled() {
            Err(SubstrateError::Unavailable(
                "substrate is shutting down".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl<H, M> SubstrateClient for LocalSubstrate<H, M>
where
    H: HistoryRepository + 'static,
    M: MessageSender,
{
    async fn start_engine(&self, request: StartEngineRequest) -> Result<(), SubstrateError> {
        self.ensure_running()?;
        if request.task_queue != self.inner.config.task_queue {
            return Err(SubstrateError::Rejected(format!(
                "task queue '{}' is not served here (expected '{}')",
                request.task_queue, self.inner.config.task_queue
            )));
        }
        if self.inner.instances.contains_key(&request.workflow_id) {
            return Err(SubstrateError::AlreadyStarted(request.workflow_id));
        }

        self.inner
            .history
            .append(
                &request.workflow_id,
                &HistoryEvent::WorkflowStarted {
                    input: request.input.clone(),
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    SubstrateError::AlreadyStarted(request.workflow_id.clone())
                }
                other => journal(other),
            })?;

        tracing::info!(
            workflow_id = request.workflow_id.as_str(),
            task_queue = request.task_queue.as_str(),
            steps = request.input.actions.len(),
            "workflow started"
        );

        let machine = CadenceMachine::new(&request.workflow_id, request.input);
        self.spawn_instance(
            request.workflow_id,
            ReplayState {
                machine,
                pending_signals: Default::default(),
                active_timer: None,
                next_signal_seq: 1,
                terminal: None,
            },
            false,
        )
        .await;
        Ok(())
    }

    async fn signal_mutate(&self, workflow_id: &str, actions: Vec<Action>) -> Result<(), SubstrateError> {
        self.ensure_running()?;
        let Some(instance) = self
            .inner
            .instances
            .get(workflow_id)
            .map(|i| Arc::clone(i.value()))
        else {
            return self.signal_journal(workflow_id).await;
        };

        if instance.state.borrow().is_completed() {
            tracing::debug!(workflow_id, "signal to completed workflow ignored");
            return Ok(());
        }

        let mut inbox = instance.inbox.lock().await;
        if inbox.tx.is_closed() {
            return Err(SubstrateError::Rejected(format!(
                "workflow {workflow_id} is no longer running"
            )));
        }

        let seq = inbox.next_seq;
        self.inner
            .history
            .append(
                workflow_id,
                &HistoryEvent::SignalReceived {
                    seq,
                    actions: actions.clone(),
                },
            )
            .await
            .map_err(journal)?;
        inbox.next_seq += 1;

        if inbox.tx.send(Signal { seq, actions }).is_err() {
            // The engine finished between the check and the send; the signal
            // is journaled behind the terminal entry and never applied.
            tracing::debug!(workflow_id, seq, "engine exited before signal delivery");
        }
        Ok(())
    }

    async fn query_state(&self, workflow_id: &str) -> Result<ExecutionState, SubstrateError> {
        let snapshot = self
            .inner
            .instances
            .get(workflow_id)
            .map(|i| i.state.borrow().clone());
        match snapshot {
            Some(state) => Ok(state),
            None => Ok(self.replay_journal(workflow_id).await?.machine.snapshot()),
        }
    }

    async fn ping(&self) -> Result<(), SubstrateError> {
        self.ensure_running()
    }
}

fn journal(err: RepositoryError) -> SubstrateError {
    SubstrateError::Journal(err.to_string())
}

async fn fail_workflow<H: HistoryRepository>(
    history: &H,
    bus: &EventBus,
    workflow_id: &str,
    err: &EngineError,
) {
    tracing::error!(workflow_id, error = %err, "workflow failed");
    let event = HistoryEvent::WorkflowFailed {
        error: err.to_string(),
    };
    if let Err(journal_err) = history.append(workflow_id, &event).await {
        tracing::error!(
            workflow_id,
            error = %journal_err,
            "failed to journal workflow failure"
        );
    }
    bus.publish(CadenceEvent::EngineFailed {
        workflow_id: workflow_id.to_string(),
        error: err.to_string(),
    });
}

// ---------------------------------------------------------------------------
// LocalContext
// ---------------------------------------------------------------------------

/// Engine context for an instance hosted by [`LocalSubstrate`].
pub struct LocalContext<H, M> {
    workflow_id: String,
    signals: mpsc::UnboundedReceiver<Signal>,
    history: Arc<H>,
    sender: Arc<M>,
    retry: RetryPolicy,
    state_tx: watch::Sender<ExecutionState>,
    /// Timer armed before a restart, consumed by the first matching wait.
    resumed_timer: Option<ActiveTimer>,
}

impl<H, M> LocalContext<H, M>
where
    H: HistoryRepository,
    M: MessageSender,
{
    /// Deadline for `timer`: the journaled one when resuming the same step
    /// execution, otherwise a new one, journaled before waiting.
    async fn deadline(&mut self, timer: TimerRequest) -> Result<DateTime<Utc>, EngineError> {
        if let Some(resumed) = self.resumed_timer.take() {
            if resumed.cursor == timer.cursor && resumed.version == timer.version {
                tracing::debug!(
                    workflow_id = self.workflow_id.as_str(),
                    cursor = timer.cursor,
                    fire_at = %resumed.fire_at,
                    "resuming journaled timer"
                );
                return Ok(resumed.fire_at);
            }
        }

        let delta = chrono::Duration::from_std(timer.duration).unwrap_or(chrono::Duration::MAX);
        let fire_at = Utc::now()
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.history
            .append(
                &self.workflow_id,
                &HistoryEvent::TimerStarted {
                    cursor: timer.cursor,
                    version: timer.version,
                    fire_at,
                },
            )
            .await
            .map_err(|e| EngineError::Journal(e.to_string()))?;
        Ok(fire_at)
    }
}

impl<H, M> EngineContext for LocalContext<H, M>
where
    H: HistoryRepository,
    M: MessageSender,
{
    fn take_signal(&mut self) -> Option<Signal> {
        self.signals.try_recv().ok()
    }

    async fn send_message(&mut self, request: &SendRequest) -> Result<SendReceipt, EngineError> {
        deliver_with_retry(self.sender.as_ref(), request, &self.retry).await
    }

    async fn wait_for_signal(&mut self, timer: TimerRequest) -> Result<WaitOutcome, EngineError> {
        let fire_at = self.deadline(timer).await?;
        let remaining = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            biased;
            Some(signal) = self.signals.recv() => Ok(WaitOutcome::Signal(signal)),
            _ = tokio::time::sleep(remaining) => Ok(WaitOutcome::TimerFired),
        }
    }

    async fn commit(&mut self, event: HistoryEvent, state: &ExecutionState) -> Result<(), EngineError> {
        self.history
            .append(&self.workflow_id, &event)
            .await
            .map_err(|e| EngineError::Journal(e.to_string()))?;
        self.state_tx.send_replace(state.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
