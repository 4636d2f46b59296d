//! Enrollment registry trait.

use cadence_types::enrollment::Enrollment;
use cadence_types::error::RepositoryError;

/// Registry mapping enrollment ids to their engine instances.
pub trait EnrollmentRepository: Send + Sync {
    fn create(
        &self,
        enrollment: &Enrollment,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Enrollment>, RepositoryError>> + Send;

    /// Remove an enrollment. Returns whether it existed.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Enrollments into one cadence.
    fn list_by_cadence(
        &self,
        cadence_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Enrollment>, RepositoryError>> + Send;
}
