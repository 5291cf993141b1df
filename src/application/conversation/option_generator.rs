//! Second step of a round: candidate answers for the question just asked.

use std::sync::Arc;

use super::errors::ConversationError;
use crate::application::retry::RetryPolicy;
use crate::domain::assessment::ChatMessage;
use crate::ports::GenerationPort;

pub const DEFAULT_OPTION_COUNT: usize = 3;

const ROLE_PREFIXES: &[&str] = &["user", "human", "assistant", "ai", "answer", "option"];

pub struct OptionGenerator {
    generator: Arc<dyn GenerationPort>,
    retry: RetryPolicy,
    option_count: usize,
}

impl OptionGenerator {
    pub fn new(generator: Arc<dyn GenerationPort>, retry: RetryPolicy) -> Self {
        Self {
            generator,
            retry,
            option_count: DEFAULT_OPTION_COUNT,
        }
    }

    pub fn with_option_count(mut self, option_count: usize) -> Self {
        self.option_count = option_count.max(1);
        self
    }

    /// Generates options one at a time, each call seeing the ones before it.
    pub async fn generate(
        &self,
        history: &[ChatMessage],
    ) -> Result<Vec<String>, ConversationError> {
        let mut options: Vec<String> = Vec::with_capacity(self.option_count);

        for index in 0..self.option_count {
            let raw = self
                .retry
                .run("generate_option", || {
                    self.generator.generate_option(history, &options)
                })
                .await?;

            let option = strip_role_prefix(&raw);
            if option.is_empty() {
                return Err(ConversationError::invalid_response("Generated option is empty")
                    .with_detail("option_index", index));
            }
            options.push(option);
        }

        tracing::debug!(count = options.len(), "Generated answer options");
        Ok(options)
    }
}

/// Drops leading `role:` labels and surrounding quotes from model output.
pub fn strip_role_prefix(raw: &str) -> String {
    let mut text = raw.trim();

    loop {
        let Some((label, rest)) = text.split_once(':') else {
            break;
        };
        let label = label.trim().to_ascii_lowercase();
        let is_role = ROLE_PREFIXES.iter().any(|prefix| {
            label == *prefix
                || label
                    .strip_prefix(prefix)
                    .is_some_and(|n| n.trim().chars().all(|c| c.is_ascii_digit()))
        });
        if !is_role {
            break;
        }
        text = rest.trim();
    }

    text.trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError, PromptedGenerator};
    use crate::application::retry::RecordingSleeper;
    use crate::ports::GenerationError;
    use std::time::Duration;

    fn generator(provider: &MockAIProvider, sleeper: Arc<RecordingSleeper>) -> OptionGenerator {
        OptionGenerator::new(
            Arc::new(PromptedGenerator::new(Arc::new(provider.clone()))),
            RetryPolicy::new().with_sleeper(sleeper),
        )
    }

    #[test]
    fn strips_role_labels_case_insensitively() {
        assert_eq!(strip_role_prefix("User: I stay home"), "I stay home");
        assert_eq!(strip_role_prefix("  HUMAN:  Reading  "), "Reading");
        assert_eq!(strip_role_prefix("Option 2: \"Go out\""), "Go out");
        assert_eq!(strip_role_prefix("assistant: user: nested"), "nested");
    }

    #[test]
    fn keeps_colons_that_are_not_role_labels() {
        assert_eq!(
            strip_role_prefix("Honestly: it depends on the day"),
            "Honestly: it depends on the day"
        );
        assert_eq!(strip_role_prefix("No colon here"), "No colon here");
    }

    #[tokio::test]
    async fn generates_three_options_each_seeing_earlier_ones() {
        let provider = MockAIProvider::new()
            .with_response("user: first")
            .with_response("second")
            .with_response("third");
        let options = generator(&provider, Arc::new(RecordingSleeper::new()))
            .generate(&[ChatMessage::assistant("Q?")])
            .await
            .unwrap();

        assert_eq!(options, vec!["first", "second", "third"]);
        let calls = provider.get_calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].messages[0].content.contains("first\nsecond"));
    }

    #[tokio::test]
    async fn each_option_call_is_retried_individually() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let provider = MockAIProvider::new()
            .with_response("one")
            .with_error(MockError::RateLimited { retry_after_secs: 1 })
            .with_response("two")
            .with_response("three");

        let options = generator(&provider, sleeper.clone())
            .generate(&[])
            .await
            .unwrap();

        assert_eq!(options.len(), 3);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn empty_option_is_invalid_response() {
        let provider = MockAIProvider::new().with_response("User:   ");
        let err = generator(&provider, Arc::new(RecordingSleeper::new()))
            .generate(&[])
            .await
            .unwrap_err();

        match err {
            ConversationError::InvalidResponse { details, .. } => {
                assert_eq!(details.get("option_index"), Some(&"0".to_string()));
            }
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let provider = MockAIProvider::new()
            .with_error(MockError::Timeout { timeout_secs: 1 })
            .with_error(MockError::Timeout { timeout_secs: 2 })
            .with_error(MockError::Timeout { timeout_secs: 3 });

        let err = generator(&provider, Arc::new(RecordingSleeper::new()))
            .generate(&[])
            .await
            .unwrap_err();

        match err {
            ConversationError::Generation(GenerationError::Timeout(message)) => {
                assert!(message.contains("3s"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn option_count_is_configurable() {
        let provider = MockAIProvider::new();
        let options = generator(&provider, Arc::new(RecordingSleeper::new()))
            .with_option_count(2)
            .generate(&[])
            .await
            .unwrap();

        assert_eq!(options, vec!["Mock response 1", "Mock response 2"]);
    }
}
