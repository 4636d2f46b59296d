//! Seams between the engine run loop and the substrate hosting it.
//!
//! The run loop never touches a clock, a channel or a database directly. It
//! asks its [`EngineContext`] to deliver a message, to wait for a timer or a
//! signal (whichever comes first), to hand over queued signals, and to commit
//! each transition to the journal. The substrate decides how.

use std::time::Duration;

use cadence_types::action::Action;
use cadence_types::execution::{ExecutionState, SendReceipt, SendRequest};
use cadence_types::history::HistoryEvent;

// ---------------------------------------------------------------------------
// Signals and timers
// ---------------------------------------------------------------------------

/// A mutation signal as delivered to an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Position in the workflow's signal inbox, starting at 1.
    pub seq: u64,
    pub actions: Vec<Action>,
}

/// A wait step's timer, identified by the step execution that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub cursor: usize,
    pub version: u64,
    pub duration: Duration,
}

/// Which side of the WAIT race finished first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    TimerFired,
    Signal(Signal),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery rejected: {0}")]
    Rejected(String),

    #[error("delivery attempt timed out")]
    Timeout,
}

/// Errors that stop an engine run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Every delivery attempt allowed by the retry policy failed.
    #[error("delivery '{key}' failed after {attempts} attempt(s): {source}")]
    Delivery {
        key: String,
        attempts: u32,
        #[source]
        source: DeliveryError,
    },

    #[error("journal error: {0}")]
    Journal(String),

    /// The hosting substrate is shutting down.
    #[error("engine shut down")]
    Shutdown,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Performs the message side effect.
///
/// Implementations must treat `request.idempotency_key` as a dedupe key: a
/// repeated key returns the original receipt without a second delivery.
pub trait MessageSender: Send + Sync + 'static {
    fn send(
        &self,
        request: &SendRequest,
    ) -> impl std::future::Future<Output = Result<SendReceipt, DeliveryError>> + Send;
}

impl<T: MessageSender> MessageSender for std::sync::Arc<T> {
    fn send(
        &self,
        request: &SendRequest,
    ) -> impl std::future::Future<Output = Result<SendReceipt, DeliveryError>> + Send {
        (**self).send(request)
    }
}

/// Everything an engine run needs from the substrate hosting it.
pub trait EngineContext: Send {
    /// Pop the oldest queued signal without waiting.
    fn take_signal(&mut self) -> Option<Signal>;

    /// Deliver a message under the substrate's retry policy.
    fn send_message(
        &mut self,
        request: &SendRequest,
    ) -> impl std::future::Future<Output = Result<SendReceipt, EngineError>> + Send;

    /// Race the wait step's timer against the next signal.
    ///
    /// A signal that is already queued wins over a timer that is already due.
    fn wait_for_signal(
        &mut self,
        timer: TimerRequest,
    ) -> impl std::future::Future<Output = Result<WaitOutcome, EngineError>> + Send;

    /// Journal `event` and publish `state` as the new query snapshot.
    fn commit(
        &mut self,
        event: HistoryEvent,
        state: &ExecutionState,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;
}
