//! Enrollment coordinator.
//!
//! Binds a contact to a cadence by starting one engine instance per
//! enrollment, and routes status queries and step-list replacements to that
//! instance. Every substrate-facing operation consults the
//! [`ConnectionManager`] first; a transport failure seen mid-call is reported
//! back to it so the background loop reconnects.

use std::sync::Arc;

use cadence_types::action::Action;
use cadence_types::enrollment::{
    CreateEnrollmentRequest, Enrollment, EnrollmentStatusView, MutationAck,
};
use cadence_types::error::{EnrollmentError, RepositoryError, SubstrateError};
use cadence_types::execution::{EngineInput, StartEngineRequest};

use crate::repository::cadence::CadenceRepository;
use crate::repository::enrollment::EnrollmentRepository;
use crate::substrate::{ConnectionManager, SubstrateClient};

pub struct EnrollmentCoordinator<C: CadenceRepository, E: EnrollmentRepository, S: SubstrateClient> {
    cadences: C,
    enrollments: E,
    substrate: S,
    connection: Arc<ConnectionManager>,
    task_queue: String,
}

impl<C, E, S> EnrollmentCoordinator<C, E, S>
where
    C: CadenceRepository,
    E: EnrollmentRepository,
    S: SubstrateClient,
{
    pub fn new(
        cadences: C,
        enrollments: E,
        substrate: S,
        connection: Arc<ConnectionManager>,
        task_queue: impl Into<String>,
    ) -> Self {
        Self {
            cadences,
            enrollments,
            substrate,
            connection,
            task_queue: task_queue.into(),
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Enroll a contact: snapshot the cadence's steps into a new engine.
    pub async fn enroll(
        &self,
        request: CreateEnrollmentRequest,
    ) -> Result<Enrollment, EnrollmentError> {
        self.ensure_connected()?;

        let cadence = self
            .cadences
            .get(&request.cadence_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| EnrollmentError::CadenceNotFound(request.cadence_id.clone()))?;

        let enrollment = Enrollment::new(&cadence.id, request.contact_email);

        // Recorded before the engine starts, removed again if it does not.
        self.enrollments
            .create(&enrollment)
            .await
            .map_err(storage)?;

        let started = self
            .substrate
            .start_engine(StartEngineRequest {
                workflow_id: enrollment.workflow_id.clone(),
                task_queue: self.task_queue.clone(),
                input: EngineInput {
                    actions: cadence.steps,
                    subject_contact: enrollment.contact_email.clone(),
                    definition_id: cadence.id,
                },
            })
            .await;

        if let Err(err) = started {
            if let Err(rollback) = self.enrollments.delete(&enrollment.id).await {
                tracing::error!(
                    enrollment_id = enrollment.id.as_str(),
                    error = %rollback,
                    "failed to remove enrollment after engine start failed"
                );
            }
            return Err(self.substrate_error(err));
        }

        tracing::info!(
            enrollment_id = enrollment.id.as_str(),
            workflow_id = enrollment.workflow_id.as_str(),
            cadence_id = enrollment.cadence_id.as_str(),
            "contact enrolled"
        );
        Ok(enrollment)
    }

    /// Live status of an enrollment, degraded when the substrate cannot answer.
    pub async fn status(&self, id: &str) -> Result<EnrollmentStatusView, EnrollmentError> {
        let enrollment = self.find(id).await?;

        if !self.connection.is_connected() {
            let detail = self.connection.detail();
            return Ok(EnrollmentStatusView::disconnected(enrollment, detail));
        }

        match self.substrate.query_state(&enrollment.workflow_id).await {
            Ok(state) => Ok(EnrollmentStatusView::live(enrollment, state)),
            Err(err) => {
                self.connection.report_failure(&err);
                tracing::warn!(
                    enrollment_id = id,
                    workflow_id = enrollment.workflow_id.as_str(),
                    error = %err,
                    "failed to query engine state"
                );
                Ok(EnrollmentStatusView::unknown(enrollment, err.to_string()))
            }
        }
    }

    /// Replace a running enrollment's steps.
    pub async fn update_cadence(
        &self,
        id: &str,
        steps: Vec<Action>,
    ) -> Result<MutationAck, EnrollmentError> {
        self.ensure_connected()?;
        let enrollment = self.find(id).await?;

        let steps_len = steps.len();
        self.substrate
            .signal_mutate(&enrollment.workflow_id, steps)
            .await
            .map_err(|e| self.substrate_error(e))?;

        tracing::info!(
            enrollment_id = id,
            workflow_id = enrollment.workflow_id.as_str(),
            steps = steps_len,
            "mutation signal sent"
        );
        Ok(MutationAck {
            success: true,
            enrollment_id: enrollment.id,
        })
    }

    async fn find(&self, id: &str) -> Result<Enrollment, EnrollmentError> {
        self.enrollments
            .get(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| EnrollmentError::NotFound(id.to_string()))
    }

    fn ensure_connected(&self) -> Result<(), EnrollmentError> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(EnrollmentError::Unavailable(self.connection.detail()))
        }
    }

    fn substrate_error(&self, err: SubstrateError) -> EnrollmentError {
        self.connection.report_failure(&err);
        match err {
            SubstrateError::Unavailable(msg) => EnrollmentError::Unavailable(msg),
            SubstrateError::WorkflowNotFound(id) => EnrollmentError::WorkflowNotFound(id),
            other => EnrollmentError::Substrate(other.to_string()),
        }
    }
}

fn storage(err: RepositoryError) -> EnrollmentError {
    EnrollmentError::StorageError(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
