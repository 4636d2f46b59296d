//! Journal entries recorded by the substrate for each engine instance.
//!
//! The journal is append-only. Replaying it through the engine's transition
//! function reproduces the engine state exactly, which is how instances
//! survive a process restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::execution::{EngineInput, SendReceipt};

/// A single journaled fact about an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// The instance was created with this input.
    WorkflowStarted { input: EngineInput },
    /// A mutation signal was accepted into the instance's inbox.
    SignalReceived { seq: u64, actions: Vec<Action> },
    /// The engine consumed inbox signal `seq` and applied it.
    MutationApplied { seq: u64 },
    /// The send step at `cursor` was delivered.
    MessageSent { cursor: usize, receipt: SendReceipt },
    /// A wait step at `cursor`/`version` armed a timer due at `fire_at`.
    TimerStarted {
        cursor: usize,
        version: u64,
        fire_at: DateTime<Utc>,
    },
    /// The wait step at `cursor` ran to its deadline.
    TimerFired { cursor: usize },
    WorkflowCompleted,
    WorkflowFailed { error: String },
}

impl HistoryEvent {
    /// Short name used for logs and the SQLite `event_type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEvent::WorkflowStarted { .. } => "workflow_started",
            HistoryEvent::SignalReceived { .. } => "signal_received",
            HistoryEvent::MutationApplied { .. } => "mutation_applied",
            HistoryEvent::MessageSent { .. } => "message_sent",
            HistoryEvent::TimerStarted { .. } => "timer_started",
            HistoryEvent::TimerFired { .. } => "timer_fired",
            HistoryEvent::WorkflowCompleted => "workflow_completed",
            HistoryEvent::WorkflowFailed { .. } => "workflow_failed",
        }
    }

    /// Whether this event closes the journal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HistoryEvent::WorkflowCompleted | HistoryEvent::WorkflowFailed { .. }
        )
    }
}

/// A journal entry as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub workflow_id: String,
    /// Position in the workflow's journal, starting at 1.
    pub seq: u64,
    pub event: HistoryEvent,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let json = serde_json::to_value(HistoryEvent::TimerFired { cursor: 2 }).unwrap();
        assert_eq!(json["type"], "timer_fired");
        assert_eq!(json["cursor"], 2);
        assert_eq!(HistoryEvent::TimerFired { cursor: 2 }.kind(), "timer_fired");
    }

    #[test]
    fn terminal_events() {
        assert!(HistoryEvent::WorkflowCompleted.is_terminal());
        assert!(
            HistoryEvent::WorkflowFailed {
                error: "boom".to_string()
            }
            .is_terminal()
        );
        assert!(!HistoryEvent::MutationApplied { seq: 1 }.is_terminal());
    }
}
