//! Pure cadence state machine.
//!
//! `CadenceMachine` owns an [`ExecutionState`] and changes it only through
//! [`CadenceMachine::apply`], a synchronous transition function over tagged
//! [`EngineEvent`]s. The async runner decides *which* event happened (a step
//! finished, or a mutation arrived first); this module decides *what that
//! means*. Replay after a crash feeds the same events through the same
//! function, so live execution and recovery cannot disagree.
//!
//! # Transitions
//!
//! | state     | event                         | result                          |
//! |-----------|-------------------------------|---------------------------------|
//! | RUNNING   | `StepCompleted`               | cursor + 1, COMPLETED at end    |
//! | RUNNING   | `MutationReceived(len > cur)` | actions replaced, version + 1   |
//! | RUNNING   | `MutationReceived(len <= cur)`| actions replaced, version + 1, COMPLETED |
//! | COMPLETED | any                           | ignored                         |

use std::time::Duration;

use cadence_types::action::{Action, ActionKind};
use cadence_types::execution::{EngineInput, ExecutionState, ExecutionStatus, SendRequest};

// ---------------------------------------------------------------------------
// Events, transitions, commands
// ---------------------------------------------------------------------------

/// Something that happened to the step at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The step at the cursor finished: the send was delivered or the wait
    /// ran to its deadline.
    StepCompleted,
    /// A mutation replaced the step list before the current step finished.
    MutationReceived(Vec<Action>),
}

/// Why an engine reached COMPLETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// The cursor walked off the end of the list.
    Exhausted,
    /// A mutation left no steps at or after the cursor.
    Truncated,
}

/// The observable effect of applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The cursor moved to `cursor`; more steps remain.
    Advanced { cursor: usize },
    /// The list was replaced; evaluation restarts at the unchanged cursor.
    Restarted { version: u64 },
    Completed {
        reason: CompletionReason,
        version: u64,
    },
    /// The machine was already COMPLETED.
    Ignored,
}

/// What the runner must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendMessage(SendRequest),
    Wait {
        cursor: usize,
        version: u64,
        duration: Duration,
    },
    /// Nothing left to execute; the run is over.
    Finish,
}

// ---------------------------------------------------------------------------
// CadenceMachine
// ---------------------------------------------------------------------------

/// Deterministic engine state plus its transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenceMachine {
    workflow_id: String,
    state: ExecutionState,
}

impl CadenceMachine {
    /// A fresh machine at cursor 0, version 1.
    pub fn new(workflow_id: impl Into<String>, input: EngineInput) -> Self {
        Self::from_state(workflow_id, ExecutionState::new(input))
    }

    /// Wrap an existing state (used by replay).
    pub fn from_state(workflow_id: impl Into<String>, state: ExecutionState) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            state,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> ExecutionState {
        self.state.clone()
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    /// Decide the next command from the current state. Never mutates.
    pub fn next_command(&self) -> Command {
        if self.state.is_completed() {
            return Command::Finish;
        }
        let Some(action) = self.state.current_action() else {
            return Command::Finish;
        };

        match &action.kind {
            ActionKind::SendMessage { subject, body } => Command::SendMessage(SendRequest {
                to: self.state.subject_contact.clone(),
                subject: subject.clone().unwrap_or_default(),
                body: body.clone().unwrap_or_default(),
                idempotency_key: self.step_key(),
            }),
            ActionKind::Wait { .. } => Command::Wait {
                cursor: self.state.cursor,
                version: self.state.version,
                // wait_duration is always Some for a wait step
                duration: action.wait_duration().unwrap_or_default(),
            },
        }
    }

    /// Apply an event and report what changed.
    pub fn apply(&mut self, event: EngineEvent) -> Transition {
        if self.state.is_completed() {
            return Transition::Ignored;
        }

        match event {
            EngineEvent::StepCompleted => {
                let len = self.state.actions.len();
                self.state.cursor = (self.state.cursor + 1).min(len);
                if self.state.cursor >= len {
                    self.state.status = ExecutionStatus::Completed;
                    Transition::Completed {
                        reason: CompletionReason::Exhausted,
                        version: self.state.version,
                    }
                } else {
                    Transition::Advanced {
                        cursor: self.state.cursor,
                    }
                }
            }
            EngineEvent::MutationReceived(actions) => {
                self.state.actions = actions;
                self.state.version += 1;
                if self.state.actions.len() <= self.state.cursor {
                    // Keep the cursor inside [0, len] after a truncation.
                    self.state.cursor = self.state.cursor.min(self.state.actions.len());
                    self.state.status = ExecutionStatus::Completed;
                    Transition::Completed {
                        reason: CompletionReason::Truncated,
                        version: self.state.version,
                    }
                } else {
                    Transition::Restarted {
                        version: self.state.version,
                    }
                }
            }
        }
    }

    /// Mark the run COMPLETED. Used when the loop exits with nothing left to do
    /// (for example an engine started with an empty list).
    pub fn finish(&mut self) -> bool {
        if self.state.is_completed() {
            return false;
        }
        self.state.status = ExecutionStatus::Completed;
        true
    }

    /// Idempotency key of the step currently at the cursor.
    pub fn step_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.workflow_id, self.state.cursor, self.state.version
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(actions: Vec<Action>) -> CadenceMachine {
        CadenceMachine::new(
            "wf-1",
            EngineInput {
                actions,
                subject_contact: "ada@example.com".to_string(),
                definition_id: "cad_1".to_string(),
            },
        )
    }

    fn welcome_cadence() -> Vec<Action> {
        vec![
            Action::send("s1", "Welcome", "Hello"),
            Action::wait("w1", 10),
            Action::send("s2", "Follow up", "Still there?"),
        ]
    }

    #[test]
    fn first_command_is_send_to_subject_contact() {
        let m = machine(welcome_cadence());
        match m.next_command() {
            Command::SendMessage(req) => {
                assert_eq!(req.to, "ada@example.com");
                assert_eq!(req.subject, "Welcome");
                assert_eq!(req.idempotency_key, "wf-1:0:1");
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn send_without_subject_uses_empty_strings() {
        let m = machine(vec![Action {
            id: "s".to_string(),
            kind: ActionKind::SendMessage {
                subject: None,
                body: None,
            },
        }]);
        let Command::SendMessage(req) = m.next_command() else {
            panic!("expected send");
        };
        assert_eq!(req.subject, "");
        assert_eq!(req.body, "");
    }

    #[test]
    fn steps_advance_until_exhausted() {
        let mut m = machine(welcome_cadence());
        assert_eq!(m.apply(EngineEvent::StepCompleted), Transition::Advanced { cursor: 1 });
        assert!(matches!(
            m.next_command(),
            Command::Wait { cursor: 1, version: 1, duration } if duration == Duration::from_secs(10)
        ));
        assert_eq!(m.apply(EngineEvent::StepCompleted), Transition::Advanced { cursor: 2 });
        assert_eq!(
            m.apply(EngineEvent::StepCompleted),
            Transition::Completed {
                reason: CompletionReason::Exhausted,
                version: 1
            }
        );
        assert_eq!(m.state().cursor, 3);
        assert!(m.is_completed());
        assert_eq!(m.next_command(), Command::Finish);
    }

    #[test]
    fn truncating_mutation_completes_immediately() {
        let mut m = machine(welcome_cadence());
        m.apply(EngineEvent::StepCompleted);

        let transition = m.apply(EngineEvent::MutationReceived(vec![Action::send(
            "n1", "New", "",
        )]));
        assert_eq!(
            transition,
            Transition::Completed {
                reason: CompletionReason::Truncated,
                version: 2
            }
        );
        assert_eq!(m.state().version, 2);
        assert_eq!(m.state().cursor, 1);
        assert_eq!(m.next_command(), Command::Finish);
    }

    #[test]
    fn mutation_to_empty_list_keeps_cursor_in_bounds() {
        let mut m = machine(welcome_cadence());
        m.apply(EngineEvent::StepCompleted);
        m.apply(EngineEvent::StepCompleted);
        m.apply(EngineEvent::MutationReceived(Vec::new()));
        assert_eq!(m.state().cursor, 0);
        assert!(m.is_completed());
    }

    #[test]
    fn longer_mutation_restarts_at_same_cursor_with_new_action() {
        let mut m = machine(welcome_cadence());
        m.apply(EngineEvent::StepCompleted);

        let replacement = vec![
            Action::send("s1", "Welcome", "Hello"),
            Action::send("x", "Replaced", "Now a send"),
            Action::wait("w2", 60),
        ];
        assert_eq!(
            m.apply(EngineEvent::MutationReceived(replacement)),
            Transition::Restarted { version: 2 }
        );
        assert_eq!(m.state().cursor, 1);
        let Command::SendMessage(req) = m.next_command() else {
            panic!("expected the new action at the cursor");
        };
        assert_eq!(req.subject, "Replaced");
        assert_eq!(req.idempotency_key, "wf-1:1:2");
    }

    #[test]
    fn identical_mutation_still_bumps_version() {
        let mut m = machine(welcome_cadence());
        m.apply(EngineEvent::StepCompleted);
        assert_eq!(
            m.apply(EngineEvent::MutationReceived(welcome_cadence())),
            Transition::Restarted { version: 2 }
        );
        assert_eq!(m.state().cursor, 1);
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let mut m = machine(vec![Action::wait("w", 1)]);
        m.apply(EngineEvent::StepCompleted);
        assert!(m.is_completed());

        let before = m.snapshot();
        assert_eq!(
            m.apply(EngineEvent::MutationReceived(welcome_cadence())),
            Transition::Ignored
        );
        assert_eq!(m.apply(EngineEvent::StepCompleted), Transition::Ignored);
        assert_eq!(m.snapshot(), before);
        assert_eq!(m.state().version, 1);
    }

    #[test]
    fn empty_cadence_finishes_without_commands() {
        let mut m = machine(Vec::new());
        assert_eq!(m.next_command(), Command::Finish);
        assert!(m.finish());
        assert!(m.is_completed());
        assert!(!m.finish());
        assert_eq!(m.state().cursor, 0);
    }

    #[test]
    fn version_unchanged_by_step_advancement() {
        let mut m = machine(welcome_cadence());
        m.apply(EngineEvent::StepCompleted);
        m.apply(EngineEvent::StepCompleted);
        assert_eq!(m.state().version, 1);
    }
}
