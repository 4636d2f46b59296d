//! Async run loop for one cadence engine instance.
//!
//! # Execution flow
//!
//! 1. Apply every queued signal (mutations received while a send was in flight).
//! 2. Ask the machine for the next command.
//! 3. `SendMessage`: deliver, then apply `StepCompleted`.
//! 4. `Wait`: race the timer against the next signal; apply whichever won.
//! 5. Commit the journal entry for the transition and publish bus events.
//! 6. On `Finish`, mark the run COMPLETED and commit `WorkflowCompleted`.

use cadence_types::event::CadenceEvent;
use cadence_types::execution::ExecutionState;
use cadence_types::history::HistoryEvent;

use crate::event::EventBus;

use super::context::{EngineContext, EngineError, Signal, TimerRequest, WaitOutcome};
use super::machine::{CadenceMachine, Command, EngineEvent, Transition};

/// Drive `machine` to completion.
///
/// Returns the final state. On error the run stops where it is; the caller
/// decides how to record the failure.
pub async fn run_cadence<C: EngineContext>(
    ctx: &mut C,
    mut machine: CadenceMachine,
    bus: &EventBus,
) -> Result<ExecutionState, EngineError> {
    loop {
        while let Some(signal) = ctx.take_signal() {
            apply_signal(ctx, &mut machine, signal, bus).await?;
        }

        if let Some(action) = machine.state().current_action() {
            tracing::debug!(
                workflow_id = machine.workflow_id(),
                cursor = machine.state().cursor,
                step = action.id.as_str(),
                kind = action.kind_label(),
                "next step"
            );
        }

        match machine.next_command() {
            Command::Finish => break,

            Command::SendMessage(request) => {
                let cursor = machine.state().cursor;
                tracing::debug!(
                    workflow_id = machine.workflow_id(),
                    cursor,
                    idempotency_key = request.idempotency_key.as_str(),
                    "sending message"
                );
                let receipt = ctx.send_message(&request).await?;

                bus.publish(CadenceEvent::MessageSent {
                    workflow_id: machine.workflow_id().to_string(),
                    cursor,
                    to: request.to.clone(),
                    subject: request.subject.clone(),
                    confirmation_id: receipt.confirmation_id.clone(),
                });

                let transition = machine.apply(EngineEvent::StepCompleted);
                ctx.commit(HistoryEvent::MessageSent { cursor, receipt }, machine.state())
                    .await?;
                publish_transition(bus, &machine, &transition);
            }

            Command::Wait {
                cursor,
                version,
                duration,
            } => {
                tracing::debug!(
                    workflow_id = machine.workflow_id(),
                    cursor,
                    version,
                    duration_secs = duration.as_secs_f64(),
                    "waiting"
                );
                let outcome = ctx
                    .wait_for_signal(TimerRequest {
                        cursor,
                        version,
                        duration,
                    })
                    .await?;

                match outcome {
                    WaitOutcome::TimerFired => {
                        let transition = machine.apply(EngineEvent::StepCompleted);
                        ctx.commit(HistoryEvent::TimerFired { cursor }, machine.state())
                            .await?;
                        publish_transition(bus, &machine, &transition);
                    }
                    WaitOutcome::Signal(signal) => {
                        tracing::debug!(
                            workflow_id = machine.workflow_id(),
                            cursor,
                            "wait interrupted by mutation"
                        );
                        apply_signal(ctx, &mut machine, signal, bus).await?;
                    }
                }
            }
        }
    }

    machine.finish();
    let state = machine.snapshot();
    ctx.commit(HistoryEvent::WorkflowCompleted, &state).await?;

    tracing::info!(
        workflow_id = machine.workflow_id(),
        cursor = state.cursor,
        version = state.version,
        "cadence completed"
    );
    bus.publish(CadenceEvent::EngineCompleted {
        workflow_id: machine.workflow_id().to_string(),
        cursor: state.cursor,
        version: state.version,
    });

    Ok(state)
}

async fn apply_signal<C: EngineContext>(
    ctx: &mut C,
    machine: &mut CadenceMachine,
    signal: Signal,
    bus: &EventBus,
) -> Result<(), EngineError> {
    let steps = signal.actions.len();
    let transition = machine.apply(EngineEvent::MutationReceived(signal.actions));
    ctx.commit(HistoryEvent::MutationApplied { seq: signal.seq }, machine.state())
        .await?;

    if transition == Transition::Ignored {
        tracing::debug!(
            workflow_id = machine.workflow_id(),
            seq = signal.seq,
            "mutation ignored, cadence already completed"
        );
        return Ok(());
    }

    tracing::info!(
        workflow_id = machine.workflow_id(),
        seq = signal.seq,
        version = machine.state().version,
        steps,
        "cadence mutated"
    );
    bus.publish(CadenceEvent::CadenceMutated {
        workflow_id: machine.workflow_id().to_string(),
        version: machine.state().version,
        steps,
    });
    Ok(())
}

fn publish_transition(bus: &EventBus, machine: &CadenceMachine, transition: &Transition) {
    if let Transition::Advanced { cursor } = transition {
        bus.publish(CadenceEvent::StepAdvanced {
            workflow_id: machine.workflow_id().to_string(),
            cursor: *cursor,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
