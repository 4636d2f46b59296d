//! Event types for the cadence event bus.
//!
//! `CadenceEvent` is broadcast by the substrate while engines run. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};

/// Lifecycle events emitted by engine instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CadenceEvent {
    /// An engine instance was started (or recovered from its journal).
    EngineStarted {
        workflow_id: String,
        steps: usize,
        recovered: bool,
    },
    /// A send step delivered its message.
    MessageSent {
        workflow_id: String,
        cursor: usize,
        to: String,
        subject: String,
        confirmation_id: String,
    },
    /// The cursor moved forward.
    StepAdvanced { workflow_id: String, cursor: usize },
    /// A mutation replaced the step list.
    CadenceMutated {
        workflow_id: String,
        version: u64,
        steps: usize,
    },
    /// The engine reached COMPLETED.
    EngineCompleted {
        workflow_id: String,
        cursor: usize,
        version: u64,
    },
    /// The engine stopped because a side effect could not be performed.
    EngineFailed { workflow_id: String, error: String },
}

impl CadenceEvent {
    /// The workflow this event belongs to.
    pub fn workflow_id(&self) -> &str {
        match self {
            CadenceEvent::EngineStarted { workflow_id, .. }
            | CadenceEvent::MessageSent { workflow_id, .. }
            | CadenceEvent::StepAdvanced { workflow_id, .. }
            | CadenceEvent::CadenceMutated { workflow_id, .. }
            | CadenceEvent::EngineCompleted { workflow_id, .. }
            | CadenceEvent::EngineFailed { workflow_id, .. } => workflow_id,
        }
    }
}
