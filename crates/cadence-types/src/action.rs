//! Action primitives: the individual steps of a cadence.
//!
//! An `Action` is pure data. The two kinds are a message send (subject/body)
//! and a timed wait (duration in seconds). Which fields exist is decided by
//! the kind, so a wait can never carry a subject and a send can never carry
//! a duration.
//!
//! Wire format (camelCase JSON):
//! ```json
//! { "id": "s1", "type": "SEND_MESSAGE", "subject": "Welcome", "body": "Hi" }
//! { "id": "s2", "type": "WAIT", "durationSeconds": 10 }
//! ```
//! `"SEND_EMAIL"` and `"seconds"` are accepted on input for older clients.
//! Wait durations may be fractional (`0.5`); negative and non-finite values
//! are rejected when the action is parsed.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Duration used for a wait step that does not specify one.
pub const DEFAULT_WAIT_SECONDS: u64 = 1;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A wait length in seconds: finite and never negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize)]
#[serde(try_from = "f64")]
pub struct WaitSeconds(f64);

// NaN cannot be constructed, so equality is total.
impl Eq for WaitSeconds {}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("durationSeconds must be a finite number >= 0, got {0}")]
pub struct InvalidWaitSeconds(pub f64);

impl WaitSeconds {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs as f64)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0
    }

    /// Values beyond what `Duration` holds saturate to `Duration::MAX`.
    pub fn to_duration(self) -> Duration {
        Duration::try_from_secs_f64(self.0).unwrap_or(Duration::MAX)
    }
}

impl TryFrom<f64> for WaitSeconds {
    type Error = InvalidWaitSeconds;

    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        if secs.is_finite() && secs >= 0.0 {
            Ok(Self(secs))
        } else {
            Err(InvalidWaitSeconds(secs))
        }
    }
}

impl Serialize for WaitSeconds {
    /// Whole seconds go out as integers so existing clients see `10`, not `10.0`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 <= MAX_EXACT_INTEGER {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl fmt::Display for WaitSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// One step of a cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Opaque step identifier. Expected to be unique within a list, not enforced.
    pub id: String,
    /// What the step does.
    #[serde(flatten)]
    pub kind: ActionKind,
}

/// The kind of a cadence step and its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Deliver a message to the enrolled contact.
    #[serde(alias = "SEND_EMAIL")]
    SendMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    /// Pause the cadence.
    Wait {
        #[serde(
            default,
            rename = "durationSeconds",
            alias = "seconds",
            skip_serializing_if = "Option::is_none"
        )]
        duration_seconds: Option<WaitSeconds>,
    },
}

impl Action {
    /// Build a send-message step.
    pub fn send(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ActionKind::SendMessage {
                subject: Some(subject.into()),
                body: Some(body.into()),
            },
        }
    }

    /// Build a wait step of `seconds`.
    pub fn wait(id: impl Into<String>, seconds: u64) -> Self {
        Self {
            id: id.into(),
            kind: ActionKind::Wait {
                duration_seconds: Some(WaitSeconds::from_secs(seconds)),
            },
        }
    }

    /// The effective wait duration, or `None` for send steps.
    ///
    /// Missing durations fall back to [`DEFAULT_WAIT_SECONDS`].
    pub fn wait_duration(&self) -> Option<Duration> {
        match self.kind {
            ActionKind::Wait { duration_seconds } => Some(
                duration_seconds
                    .map(WaitSeconds::to_duration)
                    .unwrap_or(Duration::from_secs(DEFAULT_WAIT_SECONDS)),
            ),
            ActionKind::SendMessage { .. } => None,
        }
    }

    /// Short label for logs ("send_message" / "wait").
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ActionKind::SendMessage { .. } => "send_message",
            ActionKind::Wait { .. } => "wait",
        }
    }
}
