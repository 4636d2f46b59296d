use thiserror::Error;

/// Errors related to cadence definition operations.
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("cadence {0} not found")]
    NotFound(String),

    #[error("invalid cadence: {0}")]
    Invalid(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors related to enrollment operations.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("enrollment {0} not found")]
    NotFound(String),

    #[error("cadence {0} not found")]
    CadenceNotFound(String),

    /// The enrollment exists but the substrate has no engine for it.
    #[error("workflow {0} not found")]
    WorkflowNotFound(String),

    /// The durable-execution substrate cannot be reached right now.
    #[error("substrate unavailable: {0}")]
    Unavailable(String),

    #[error("substrate error: {0}")]
    Substrate(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors surfaced by a substrate client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubstrateError {
    /// Transport-level failure; the substrate is unreachable.
    #[error("substrate unavailable: {0}")]
    Unavailable(String),

    #[error("workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("workflow {0} already started")]
    AlreadyStarted(String),

    /// The substrate answered but refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("journal error: {0}")]
    Journal(String),
}

impl SubstrateError {
    /// Whether this error means the connection itself is down.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SubstrateError::Unavailable(_))
    }
}

/// Errors from repository operations (used by trait definitions in cadence-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
