//! Execution state of a single cadence engine instance.
//!
//! `ExecutionState` is what queries return and what the journal rebuilds on
//! replay. Only the engine mutates it; everyone else sees snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Lifecycle status of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Completed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "RUNNING"),
            ExecutionStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Durable state of one enrollment's engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    /// Current step list. Replaced wholesale by mutations.
    pub actions: Vec<Action>,
    /// Index of the next action to execute, in `[0, actions.len()]`.
    pub cursor: usize,
    /// Starts at 1, incremented once per accepted mutation.
    pub version: u64,
    pub status: ExecutionStatus,
    /// Recipient of every send step. Fixed at creation.
    pub subject_contact: String,
    /// Originating cadence definition. Informational only.
    pub definition_id: String,
}

impl ExecutionState {
    /// Initial state for a fresh engine.
    pub fn new(input: EngineInput) -> Self {
        Self {
            actions: input.actions,
            cursor: 0,
            version: 1,
            status: ExecutionStatus::Running,
            subject_contact: input.subject_contact,
            definition_id: input.definition_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// The action at the cursor, if any remain.
    pub fn current_action(&self) -> Option<&Action> {
        self.actions.get(self.cursor)
    }
}

/// Arguments an engine is started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInput {
    pub actions: Vec<Action>,
    pub subject_contact: String,
    pub definition_id: String,
}

/// Request to start a new engine instance on a substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEngineRequest {
    /// Unique per enrollment; a substrate rejects duplicates.
    pub workflow_id: String,
    /// Task queue the instance is scheduled on.
    pub task_queue: String,
    pub input: EngineInput,
}

/// Payload of a mutation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateSignal {
    pub actions: Vec<Action>,
}

/// One message delivery requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Stable per step execution: `<workflow id>:<cursor>:<version>`.
    pub idempotency_key: String,
}

/// Confirmation returned by the delivery side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub success: bool,
    pub confirmation_id: String,
    pub timestamp: DateTime<Utc>,
}
