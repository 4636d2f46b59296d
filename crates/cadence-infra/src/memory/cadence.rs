//! In-memory cadence definition store.

use std::sync::Arc;

use cadence_core::repository::cadence::CadenceRepository;
use cadence_types::cadence::Cadence;
use cadence_types::error::RepositoryError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCadenceRepository {
    cadences: Arc<DashMap<String, Cadence>>,
}

impl InMemoryCadenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CadenceRepository for InMemoryCadenceRepository {
    async fn create(&self, cadence: &Cadence) -> Result<(), RepositoryError> {
        match self.cadences.entry(cadence.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "cadence {} already exists",
                cadence.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(cadence.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Cadence>, RepositoryError> {
        Ok(self.cadences.get(id).map(|c| c.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Cadence>, RepositoryError> {
        let mut cadences: Vec<Cadence> = self.cadences.iter().map(|c| c.value().clone()).collect();
        cadences.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(cadences)
    }

    async fn update(&self, cadence: &Cadence) -> Result<(), RepositoryError> {
        match self.cadences.get_mut(&cadence.id) {
            Some(mut entry) => {
                *entry = cadence.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.cadences.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use cadence_types::action::Action;

    use super::*;

    #[tokio::test]
    async fn crud_round_trip() {
        let repo = InMemoryCadenceRepository::new();
        let cadence = Cadence::new("Onboarding", vec![Action::wait("w", 5)]);

        repo.create(&cadence).await.unwrap();
        assert_eq!(repo.get(&cadence.id).await.unwrap(), Some(cadence.clone()));

        let mut renamed = cadence.clone();
        renamed.name = "Renamed".to_string();
        repo.update(&renamed).await.unwrap();
        assert_eq!(repo.get(&cadence.id).await.unwrap().unwrap().name, "Renamed");

        assert!(repo.delete(&cadence.id).await.unwrap());
        assert!(!repo.delete(&cadence.id).await.unwrap());
        assert!(repo.get(&cadence.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let repo = InMemoryCadenceRepository::new();
        let cadence = Cadence::new("A", Vec::new());
        repo.create(&cadence).await.unwrap();
        assert!(matches!(
            repo.create(&cadence).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let repo = InMemoryCadenceRepository::new();
        let cadence = Cadence::new("A", Vec::new());
        assert!(matches!(
            repo.update(&cadence).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_is_sorted_by_name_and_clones_share_state() {
        let repo = InMemoryCadenceRepository::new();
        let shared = repo.clone();
        repo.create(&Cadence::new("Zeta", Vec::new())).await.unwrap();
        repo.create(&Cadence::new("Alpha", Vec::new())).await.unwrap();

        let names: Vec<_> = shared
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
