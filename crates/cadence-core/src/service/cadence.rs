//! Cadence definition service.
//!
//! CRUD over stored definitions. Edits only affect enrollments created
//! afterwards: running engines hold their own copy of the step list.

use cadence_types::cadence::{Cadence, CreateCadenceRequest, UpdateCadenceRequest};
use cadence_types::error::{CadenceError, RepositoryError};

use crate::repository::cadence::CadenceRepository;

pub struct CadenceService<R: CadenceRepository> {
    repo: R,
}

impl<R: CadenceRepository> CadenceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, request: CreateCadenceRequest) -> Result<Cadence, CadenceError> {
        let name = validate_name(&request.name)?;
        let cadence = Cadence::new(name, request.steps);
        self.repo.create(&cadence).await.map_err(storage)?;

        tracing::info!(
            cadence_id = cadence.id.as_str(),
            steps = cadence.steps.len(),
            "cadence created"
        );
        Ok(cadence)
    }

    pub async fn list(&self) -> Result<Vec<Cadence>, CadenceError> {
        self.repo.list().await.map_err(storage)
    }

    pub async fn get(&self, id: &str) -> Result<Cadence, CadenceError> {
        self.repo
            .get(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| CadenceError::NotFound(id.to_string()))
    }

    /// Replace each provided field wholesale; absent fields are kept.
    pub async fn update(
        &self,
        id: &str,
        request: UpdateCadenceRequest,
    ) -> Result<Cadence, CadenceError> {
        let mut cadence = self.get(id).await?;
        if let Some(name) = request.name {
            cadence.name = validate_name(&name)?;
        }
        if let Some(steps) = request.steps {
            cadence.steps = steps;
        }

        self.repo.update(&cadence).await.map_err(|e| match e {
            RepositoryError::NotFound => CadenceError::NotFound(id.to_string()),
            other => storage(other),
        })?;

        tracing::info!(cadence_id = id, steps = cadence.steps.len(), "cadence updated");
        Ok(cadence)
    }

    pub async fn delete(&self, id: &str) -> Result<(), CadenceError> {
        if !self.repo.delete(id).await.map_err(storage)? {
            return Err(CadenceError::NotFound(id.to_string()));
        }
        tracing::info!(cadence_id = id, "cadence deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, CadenceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CadenceError::Invalid("name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn storage(err: RepositoryError) -> CadenceError {
    CadenceError::StorageError(err.to_string())
}
