//! Enrollment types: a contact bound to one cadence engine instance.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::cadence::short_id;
use crate::execution::{ExecutionState, ExecutionStatus};

/// Registry row mapping an enrollment to its engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Generated identifier (`enr_` + 8 hex chars).
    pub id: String,
    pub cadence_id: String,
    pub contact_email: String,
    /// Substrate workflow identifier, unique per enrollment.
    pub workflow_id: String,
}

impl Enrollment {
    /// Create a new enrollment with generated enrollment and workflow ids.
    pub fn new(cadence_id: impl Into<String>, contact_email: impl Into<String>) -> Self {
        let id = format!("enr_{}", short_id());
        let workflow_id = workflow_id_for(&id);
        Self {
            id,
            cadence_id: cadence_id.into(),
            contact_email: contact_email.into(),
            workflow_id,
        }
    }
}

/// Workflow identifier used for an enrollment's engine instance.
pub fn workflow_id_for(enrollment_id: &str) -> String {
    format!("cadence-workflow-{enrollment_id}")
}

/// Request body for enrolling a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub cadence_id: String,
    pub contact_email: String,
}

/// Request body for replacing a running enrollment's steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEnrollmentCadenceRequest {
    pub steps: Vec<Action>,
}

/// Acknowledgement of an accepted mutation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationAck {
    pub success: bool,
    pub enrollment_id: String,
}

/// Status reported for an enrollment.
///
/// `SubstrateDisconnected` and `Unknown` are degraded answers: they never
/// claim a real engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Running,
    Completed,
    SubstrateDisconnected,
    Unknown,
}

impl From<ExecutionStatus> for EnrollmentStatus {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Running => EnrollmentStatus::Running,
            ExecutionStatus::Completed => EnrollmentStatus::Completed,
        }
    }
}

/// Engine progress fields, flattened into the status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProgress {
    pub actions: Vec<Action>,
    pub cursor: usize,
    pub version: u64,
    pub subject_contact: String,
    pub definition_id: String,
}

/// Answer to "what is this enrollment doing right now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub status: EnrollmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    #[serde(flatten, default)]
    pub progress: Option<ExecutionProgress>,
}

impl EnrollmentStatusView {
    /// View backed by a live engine snapshot.
    pub fn live(enrollment: Enrollment, state: ExecutionState) -> Self {
        Self {
            enrollment,
            status: state.status.into(),
            status_detail: None,
            progress: Some(ExecutionProgress {
                actions: state.actions,
                cursor: state.cursor,
                version: state.version,
                subject_contact: state.subject_contact,
                definition_id: state.definition_id,
            }),
        }
    }

    /// View used while the substrate connection is down.
    pub fn disconnected(enrollment: Enrollment, detail: impl Into<String>) -> Self {
        Self {
            enrollment,
            status: EnrollmentStatus::SubstrateDisconnected,
            status_detail: Some(detail.into()),
            progress: None,
        }
    }

    /// View used when the engine could not be queried for another reason.
    pub fn unknown(enrollment: Enrollment, detail: impl Into<String>) -> Self {
        Self {
            enrollment,
            status: EnrollmentStatus::Unknown,
            status_detail: Some(detail.into()),
            progress: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::EngineInput;

    #[test]
    fn new_enrollment_derives_workflow_id() {
        let enrollment = Enrollment::new("cad_1", "ada@example.com");
        assert!(enrollment.id.starts_with("enr_"));
        assert_eq!(enrollment.workflow_id, format!("cadence-workflow-{}", enrollment.id));
    }

    #[test]
    fn live_view_flattens_progress() {
        let enrollment = Enrollment::new("cad_1", "ada@example.com");
        let state = ExecutionState::new(EngineInput {
            actions: vec![Action::wait("w", 3)],
            subject_contact: "ada@example.com".to_string(),
            definition_id: "cad_1".to_string(),
        });
        let json = serde_json::to_value(EnrollmentStatusView::live(enrollment, state)).unwrap();
        assert_eq!(json["status"], "RUNNING");
        assert_eq!(json["cursor"], 0);
        assert_eq!(json["version"], 1);
        assert_eq!(json["cadenceId"], "cad_1");
        assert!(json.get("statusDetail").is_none());
    }

    #[test]
    fn degraded_views_carry_detail_and_no_progress() {
        let enrollment = Enrollment::new("cad_1", "ada@example.com");
        let json = serde_json::to_value(EnrollmentStatusView::disconnected(
            enrollment.clone(),
            "substrate is not connected",
        ))
        .unwrap();
        assert_eq!(json["status"], "SUBSTRATE_DISCONNECTED");
        assert_eq!(json["statusDetail"], "substrate is not connected");
        assert!(json.get("cursor").is_none());

        let view = EnrollmentStatusView::unknown(enrollment, "workflow not found");
        assert_eq!(view.status, EnrollmentStatus::Unknown);
    }
}
