//! Generation port implemented over any `AIProvider`.

use async_trait::async_trait;
use std::sync::Arc;

use super::prompts;
use crate::domain::assessment::ChatMessage;
use crate::ports::{
    AIError, AIProvider, CompletionRequest, FinishReason, GenerationError, GenerationPort,
    MessageRole, QuestionContext,
};

/// Builds prompts, calls the provider once, and tags failures for retry.
pub struct PromptedGenerator {
    provider: Arc<dyn AIProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl PromptedGenerator {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            temperature: 0.7,
            max_tokens: 512,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn complete(&self, operation: &str, prompt: String) -> Result<String, GenerationError> {
        let request = CompletionRequest::new()
            .with_message(MessageRole::User, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await.map_err(|err| {
            tracing::warn!(operation, error = %err, "Provider call failed");
            classify(err)
        })?;

        if response.finish_reason == FinishReason::ContentFilter {
            return Err(GenerationError::Other(format!(
                "{} blocked by content filter",
                operation
            )));
        }

        tracing::debug!(
            operation,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Generation completed"
        );
        Ok(response.content.trim().to_string())
    }
}

/// Rate limits and timeouts are transient, everything else is not.
pub fn classify(err: AIError) -> GenerationError {
    match err {
        AIError::RateLimited { .. } => GenerationError::RateLimit(err.to_string()),
        AIError::Timeout { .. } => GenerationError::Timeout(err.to_string()),
        other => GenerationError::Other(other.to_string()),
    }
}

#[async_trait]
impl GenerationPort for PromptedGenerator {
    async fn generate_question(
        &self,
        history: &[ChatMessage],
        context: &QuestionContext,
    ) -> Result<String, GenerationError> {
        let prompt = prompts::question_prompt(
            &context.element_name,
            &context.element_description,
            &prompts::format_history(history),
        );
        self.complete("generate_question", prompt).await
    }

    async fn generate_option(
        &self,
        history: &[ChatMessage],
        existing_options: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = prompts::option_prompt(
            &prompts::format_history(history),
            &prompts::combine_options(existing_options),
        );
        self.complete("generate_option", prompt).await
    }

    fn model_version(&self) -> String {
        self.provider.provider_info().model
    }
}
