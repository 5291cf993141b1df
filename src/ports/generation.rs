//! Generation Port - the two text-producing capabilities of a round.

use async_trait::async_trait;

use crate::domain::assessment::{ChatMessage, ElementId};

/// Failure of a generation call, tagged for retry classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation rate limited: {0}")]
    RateLimit(String),

    #[error("generation timed out: {0}")]
    Timeout(String),

    #[error("generation failed: {0}")]
    Other(String),
}

impl GenerationError {
    /// Short tag used in logs and error details.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::RateLimit(_) => "rate_limit",
            GenerationError::Timeout(_) => "timeout",
            GenerationError::Other(_) => "other",
        }
    }
}

/// Element the next question should explore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionContext {
    pub element_id: ElementId,
    /// 0-based order of the question being produced.
    pub order: u32,
    pub element_name: String,
    pub element_description: String,
}

/// Port for the external text generator.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// Produces the next question from the phase-scoped history.
    async fn generate_question(
        &self,
        history: &[ChatMessage],
        context: &QuestionContext,
    ) -> Result<String, GenerationError>;

    /// Produces one candidate answer that differs from `existing_options`.
    async fn generate_option(
        &self,
        history: &[ChatMessage],
        existing_options: &[String],
    ) -> Result<String, GenerationError>;

    /// Identifier recorded as the question's model version.
    fn model_version(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_each_variant() {
        assert_eq!(GenerationError::RateLimit("429".into()).kind(), "rate_limit");
        assert_eq!(GenerationError::Timeout("slow".into()).kind(), "timeout");
        assert_eq!(GenerationError::Other("boom".into()).kind(), "other");
    }
}
