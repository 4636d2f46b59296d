//! In-memory enrollment registry.

use std::sync::Arc;

use cadence_core::repository::enrollment::EnrollmentRepository;
use cadence_types::enrollment::Enrollment;
use cadence_types::error::RepositoryError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Arc<DashMap<String, Enrollment>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn create(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        match self.enrollments.entry(enrollment.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "enrollment {} already exists",
                enrollment.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(enrollment.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self.enrollments.get(id).map(|e| e.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.enrollments.remove(id).is_some())
    }

    async fn list_by_cadence(&self, cadence_id: &str) -> Result<Vec<Enrollment>, RepositoryError> {
        let mut found: Vec<Enrollment> = self
            .enrollments
            .iter()
            .filter(|e| e.cadence_id == cadence_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_get_and_filter_by_cadence() {
        let repo = InMemoryEnrollmentRepository::new();
        let a = Enrollment::new("cad_a", "ada@example.com");
        let b = Enrollment::new("cad_b", "bob@example.com");
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        assert_eq!(repo.get(&a.id).await.unwrap(), Some(a.clone()));
        assert!(repo.get("enr_missing").await.unwrap().is_none());
        assert_eq!(repo.list_by_cadence("cad_a").await.unwrap(), vec![a.clone()]);

        assert!(matches!(repo.create(&a).await, Err(RepositoryError::Conflict(_))));

        assert!(repo.delete(&a.id).await.unwrap());
        assert!(!repo.delete(&a.id).await.unwrap());
        assert!(repo.get(&a.id).await.unwrap().is_none());
    }
}
