//! Element repository port - the catalogue of personality elements.

use crate::domain::assessment::{ElementId, PersonalityElement};
use crate::domain::foundation::DomainError;
use async_trait::async_trait;

/// Name and description of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub name: String,
    pub description: String,
    /// Human-readable label, e.g. "Energy (I/E)".
    pub label: String,
}

#[async_trait]
pub trait ElementRepository: Send + Sync {
    /// One canned opener drawn uniformly at random from the element's pool.
    ///
    /// Out-of-range ids are clamped to the nearest element.
    async fn get_initial_question(&self, element_id: ElementId) -> Result<String, DomainError>;

    async fn get_element_info(&self, element_id: ElementId) -> Result<ElementInfo, DomainError>;

    /// Standard-mode phase size.
    async fn get_questions_per_phase(&self) -> Result<u32, DomainError>;

    /// The whole catalogue in element-id order.
    async fn get_elements(&self) -> Result<Vec<PersonalityElement>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn ElementRepository) {}
    }
}
