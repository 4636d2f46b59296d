//! Cadence definition repository trait.

use cadence_types::cadence::Cadence;
use cadence_types::error::RepositoryError;

/// Storage for cadence definitions.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait CadenceRepository: Send + Sync {
    /// Insert a new definition. Fails with `Conflict` if the id exists.
    fn create(
        &self,
        cadence: &Cadence,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Cadence>, RepositoryError>> + Send;

    /// All definitions, ordered by name.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Cadence>, RepositoryError>> + Send;

    /// Replace a stored definition. Fails with `NotFound` if it does not exist.
    fn update(
        &self,
        cadence: &Cadence,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete by id. Returns `true` if it existed.
    fn delete(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
