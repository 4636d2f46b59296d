//! Cadence execution engine.
//!
//! - [`machine`]: pure state and transition function.
//! - [`runner`]: async loop that turns commands into side effects.
//! - [`context`]: the substrate seams the loop runs against.
//! - [`retry`]: delivery retry policy.
//! - [`replay`]: journal fold used for crash recovery.

pub mod context;
pub mod machine;
pub mod replay;
pub mod retry;
pub mod runner;

pub use context::{
    DeliveryError, EngineContext, EngineError, MessageSender, Signal, TimerRequest, WaitOutcome,
};
pub use machine::{CadenceMachine, Command, CompletionReason, EngineEvent, Transition};
pub use replay::{ActiveTimer, ReplayError, ReplayState, Terminal, replay};
pub use retry::{RetryPolicy, deliver_with_retry};
pub use runner::run_cadence;
