//! Element catalogue backed by the built-in list or a YAML file.
//!
//! YAML shape:
//!
//! ```yaml
//! questions_per_phase: 8
//! elements:
//!   - name: energy
//!     display_name: "Energy (I/E)"
//!     description: "..."
//!     initial_questions:
//!       - "..."
//! ```

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::Path;

use crate::domain::assessment::{ElementId, PersonalityElement, BUILTIN_ELEMENTS};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{ElementInfo, ElementRepository};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    questions_per_phase: Option<u32>,
    elements: Vec<PersonalityElement>,
}

#[derive(Debug, Clone)]
pub struct CatalogElementRepository {
    elements: Vec<PersonalityElement>,
    questions_per_phase: u32,
}

impl CatalogElementRepository {
    pub fn builtin(questions_per_phase: u32) -> Self {
        Self {
            elements: BUILTIN_ELEMENTS.clone(),
            questions_per_phase,
        }
    }

    /// Parses a catalogue; `questions_per_phase` applies when the file has none.
    pub fn from_yaml_str(yaml: &str, questions_per_phase: u32) -> Result<Self, DomainError> {
        let file: CatalogFile = serde_yaml::from_str(yaml).map_err(|e| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Invalid element catalogue: {}", e),
            )
        })?;

        if file.elements.is_empty() {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Element catalogue has no elements",
            ));
        }
        if let Some(empty) = file.elements.iter().find(|e| e.initial_questions.is_empty()) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Element has no initial questions",
            )
            .with_detail("element", empty.name.clone()));
        }

        Ok(Self {
            elements: file.elements,
            questions_per_phase: file
                .questions_per_phase
                .filter(|q| *q > 0)
                .unwrap_or(questions_per_phase),
        })
    }

    pub async fn from_yaml_file(
        path: impl AsRef<Path>,
        questions_per_phase: u32,
    ) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to read element catalogue: {}", e),
            )
            .with_detail("path", path.display().to_string())
        })?;

        let repository = Self::from_yaml_str(&yaml, questions_per_phase)?;
        tracing::info!(
            path = %path.display(),
            elements = repository.elements.len(),
            "Loaded element catalogue"
        );
        Ok(repository)
    }

    pub fn element_count(&self) -> u32 {
        self.elements.len() as u32
    }

    /// Looks up an element, clamping out-of-range ids.
    fn resolve(&self, element_id: ElementId) -> &PersonalityElement {
        let clamped = ElementId::clamped(i64::from(element_id.value()), self.element_count());
        if clamped != element_id {
            tracing::warn!(
                requested = element_id.value(),
                used = clamped.value(),
                "Element id out of range, clamped"
            );
        }
        &self.elements[clamped.index()]
    }
}

#[async_trait]
impl ElementRepository for CatalogElementRepository {
    async fn get_initial_question(&self, element_id: ElementId) -> Result<String, DomainError> {
        let element = self.resolve(element_id);
        element
            .initial_questions
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ElementNotFound, "Element has no initial questions")
                    .with_detail("element", element.name.clone())
            })
    }

    async fn get_element_info(&self, element_id: ElementId) -> Result<ElementInfo, DomainError> {
        let element = self.resolve(element_id);
        Ok(ElementInfo {
            name: element.name.clone(),
            description: element.description.clone(),
            label: element.label().to_string(),
        })
    }

    async fn get_questions_per_phase(&self) -> Result<u32, DomainError> {
        Ok(self.questions_per_phase)
    }

    async fn get_elements(&self) -> Result<Vec<PersonalityElement>, DomainError> {
        Ok(self.elements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOGUE: &str = r#"
questions_per_phase: 5
elements:
  - name: energy
    description: inner vs outer world
    initial_questions: ["E1", "E2"]
  - name: mind
    display_name: "Mind (N/S)"
    description: facts vs patterns
    initial_questions: ["M1"]
"#;

    #[tokio::test]
    async fn builtin_catalogue_serves_four_elements() {
        let repo = CatalogElementRepository::builtin(8);

        assert_eq!(repo.element_count(), 4);
        assert_eq!(repo.get_questions_per_phase().await.unwrap(), 8);
        let info = repo.get_element_info(ElementId::new(4).unwrap()).await.unwrap();
        assert_eq!(info.name, "tactics");
        assert_eq!(info.label, "Tactics (J/P)");
    }

    #[tokio::test]
    async fn initial_question_comes_from_the_element_pool() {
        let repo = CatalogElementRepository::builtin(8);
        let element = ElementId::new(2).unwrap();

        let question = repo.get_initial_question(element).await.unwrap();

        assert!(BUILTIN_ELEMENTS[1].initial_questions.contains(&question));
    }

    #[tokio::test]
    async fn out_of_range_ids_are_clamped() {
        let repo = CatalogElementRepository::from_yaml_str(CATALOGUE, 8).unwrap();

        let info = repo.get_element_info(ElementId::new(7).unwrap()).await.unwrap();
        assert_eq!(info.name, "mind");
        assert_eq!(
            repo.get_initial_question(ElementId::new(9).unwrap()).await.unwrap(),
            "M1"
        );
    }

    #[tokio::test]
    async fn yaml_catalogue_overrides_phase_size_and_labels() {
        let repo = CatalogElementRepository::from_yaml_str(CATALOGUE, 8).unwrap();

        assert_eq!(repo.get_questions_per_phase().await.unwrap(), 5);
        let energy = repo.get_element_info(ElementId::FIRST).await.unwrap();
        assert_eq!(energy.label, "energy");
    }

    #[test]
    fn rejects_elements_without_questions() {
        let yaml = "elements:\n  - name: energy\n    description: x\n    initial_questions: []\n";
        let err = CatalogElementRepository::from_yaml_str(yaml, 8).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("element"), Some(&"energy".to_string()));
    }

    #[test]
    fn rejects_empty_catalogue() {
        assert!(CatalogElementRepository::from_yaml_str("elements: []", 8).is_err());
    }

    #[tokio::test]
    async fn loads_catalogue_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOGUE.as_bytes()).unwrap();

        let repo = CatalogElementRepository::from_yaml_file(file.path(), 8)
            .await
            .unwrap();

        assert_eq!(repo.element_count(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = CatalogElementRepository::from_yaml_file("/nonexistent/elements.yaml", 8).await;
        assert!(result.is_err());
    }
}
