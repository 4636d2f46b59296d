//! Cadence definitions: named, ordered lists of actions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;

/// A stored cadence definition.
///
/// Enrolling a contact copies `steps` into the new engine; later edits to the
/// definition never reach engines that are already running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cadence {
    /// Generated identifier (`cad_` + 8 hex chars).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Ordered steps.
    pub steps: Vec<Action>,
}

impl Cadence {
    /// Create a definition with a freshly generated identifier.
    pub fn new(name: impl Into<String>, steps: Vec<Action>) -> Self {
        Self {
            id: generate_cadence_id(),
            name: name.into(),
            steps,
        }
    }
}

/// Request body for creating a cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCadenceRequest {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Action>,
}

/// Request body for updating a cadence. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCadenceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Action>>,
}

/// Generate a short cadence identifier, e.g. `cad_1a2b3c4d`.
pub fn generate_cadence_id() -> String {
    format!("cad_{}", short_id())
}

/// First 8 hex characters of a random v4 UUID.
pub(crate) fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_prefix_and_length() {
        let id = generate_cadence_id();
        assert!(id.starts_with("cad_"));
        assert_eq!(id.len(), 12);
        assert_ne!(id, generate_cadence_id());
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateCadenceRequest = serde_json::from_str(r#"{"name":"Renamed"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Renamed"));
        assert!(req.steps.is_none());
    }

    #[test]
    fn create_request_defaults_to_no_steps() {
        let req: CreateCadenceRequest = serde_json::from_str(r#"{"name":"Empty"}"#).unwrap();
        assert!(req.steps.is_empty());
    }
}
