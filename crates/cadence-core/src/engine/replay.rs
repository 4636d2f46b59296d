//! Rebuild engine state from a workflow journal.
//!
//! Replay folds journaled facts through [`CadenceMachine::apply`], the same
//! transition function the live run loop uses. Facts that do not move the
//! machine (signals still in the inbox, an armed timer) are collected so the
//! resumed engine sees them again.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use cadence_types::history::HistoryEvent;

use super::context::Signal;
use super::machine::{CadenceMachine, EngineEvent};

/// A wait step's timer that was armed but had not fired at the crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTimer {
    pub cursor: usize,
    pub version: u64,
    pub fire_at: DateTime<Utc>,
}

/// How a journal was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Completed,
    Failed(String),
}

/// Result of replaying a journal.
#[derive(Debug, Clone)]
pub struct ReplayState {
    pub machine: CadenceMachine,
    /// Signals received but not yet applied, oldest first.
    pub pending_signals: VecDeque<Signal>,
    pub active_timer: Option<ActiveTimer>,
    /// Sequence number the next received signal gets.
    pub next_signal_seq: u64,
    pub terminal: Option<Terminal>,
}

impl ReplayState {
    /// Whether the workflow needs to be resumed.
    pub fn is_open(&self) -> bool {
        self.terminal.is_none()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("journal for {0} is empty")]
    Empty(String),

    #[error("journal for {0} does not begin with workflow_started")]
    MissingStart(String),

    #[error("journal for {workflow_id} applies unknown signal {seq}")]
    UnknownSignal { workflow_id: String, seq: u64 },

    /// A step completion was journaled for a cursor the machine is not at.
    #[error("journal for {workflow_id} diverged: {event} at cursor {journaled}, machine at {actual}")]
    Diverged {
        workflow_id: String,
        event: &'static str,
        journaled: usize,
        actual: usize,
    },
}

/// Fold `events` (in journal order) into a [`ReplayState`].
pub fn replay(
    workflow_id: &str,
    events: impl IntoIterator<Item = HistoryEvent>,
) -> Result<ReplayState, ReplayError> {
    let mut events = events.into_iter();

    let machine = match events.next() {
        Some(HistoryEvent::WorkflowStarted { input }) => CadenceMachine::new(workflow_id, input),
        Some(_) => return Err(ReplayError::MissingStart(workflow_id.to_string())),
        None => return Err(ReplayError::Empty(workflow_id.to_string())),
    };

    let mut replayed = ReplayState {
        machine,
        pending_signals: VecDeque::new(),
        active_timer: None,
        next_signal_seq: 1,
        terminal: None,
    };

    for event in events {
        let kind = event.kind();
        match event {
            HistoryEvent::WorkflowStarted { .. } => {
                return Err(ReplayError::MissingStart(workflow_id.to_string()));
            }
            HistoryEvent::SignalReceived { seq, actions } => {
                replayed.next_signal_seq = replayed.next_signal_seq.max(seq + 1);
                replayed.pending_signals.push_back(Signal { seq, actions });
            }
            HistoryEvent::MutationApplied { seq } => {
                let position = replayed
                    .pending_signals
                    .iter()
                    .position(|s| s.seq == seq)
                    .ok_or_else(|| ReplayError::UnknownSignal {
                        workflow_id: workflow_id.to_string(),
                        seq,
                    })?;
                let signal = replayed.pending_signals.remove(position).ok_or_else(|| {
                    ReplayError::UnknownSignal {
                        workflow_id: workflow_id.to_string(),
                        seq,
                    }
                })?;
                replayed
                    .machine
                    .apply(EngineEvent::MutationReceived(signal.actions));
                replayed.active_timer = None;
            }
            HistoryEvent::MessageSent { cursor, .. } | HistoryEvent::TimerFired { cursor } => {
                let actual = replayed.machine.state().cursor;
                if cursor != actual {
                    return Err(ReplayError::Diverged {
                        workflow_id: workflow_id.to_string(),
                        event: kind,
                        journaled: cursor,
                        actual,
                    });
                }
                replayed.machine.apply(EngineEvent::StepCompleted);
                replayed.active_timer = None;
            }
            HistoryEvent::TimerStarted {
                cursor,
                version,
                fire_at,
            } => {
                replayed.active_timer = Some(ActiveTimer {
                    cursor,
                    version,
                    fire_at,
                });
            }
            HistoryEvent::WorkflowCompleted => {
                replayed.machine.finish();
                replayed.terminal = Some(Terminal::Completed);
            }
            HistoryEvent::WorkflowFailed { error } => {
                replayed.terminal = Some(Terminal::Failed(error));
            }
        }
    }

    Ok(replayed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
