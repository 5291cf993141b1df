//! First step of a round: produce and persist the next question.

use std::sync::Arc;

use super::errors::ConversationError;
use crate::application::retry::RetryPolicy;
use crate::domain::assessment::{
    filter_by_phase, ChatState, ElementId, NewQuestion, PhaseScheduler, CANNED_MODEL_VERSION,
};
use crate::domain::foundation::QuestionId;
use crate::ports::{ElementRepository, GenerationPort, QuestionContext, QuestionRepository};

/// A question that exists as text but not yet in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub element_id: ElementId,
    pub display_order: u32,
    pub model_version: String,
    /// Drawn from the element's opener pool rather than generated.
    pub canned: bool,
}

pub struct QuestionGenerator {
    generator: Arc<dyn GenerationPort>,
    elements: Arc<dyn ElementRepository>,
    questions: Arc<dyn QuestionRepository>,
    retry: RetryPolicy,
}

impl QuestionGenerator {
    pub fn new(
        generator: Arc<dyn GenerationPort>,
        elements: Arc<dyn ElementRepository>,
        questions: Arc<dyn QuestionRepository>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            elements,
            questions,
            retry,
        }
    }

    /// Produces the question for `state.next_display_order`.
    ///
    /// Phase starts use a canned opener; every other slot calls the generator
    /// with the phase-scoped history. `state` must already hold the answer to
    /// the pending question.
    pub async fn draft(
        &self,
        state: &ChatState,
        scheduler: &PhaseScheduler,
    ) -> Result<QuestionDraft, ConversationError> {
        let order = state.next_display_order;
        let slot = scheduler.classify(i64::from(order));
        let element_id = state.element_for_order(order, scheduler);

        if slot.is_phase_start {
            let text = self.elements.get_initial_question(element_id).await?;
            tracing::debug!(
                session_id = %state.session_id,
                order,
                element_id = %element_id,
                "Using canned opener"
            );
            return Ok(QuestionDraft {
                text,
                element_id,
                display_order: order,
                model_version: CANNED_MODEL_VERSION.to_string(),
                canned: true,
            });
        }

        let info = self.elements.get_element_info(element_id).await?;
        let history = filter_by_phase(
            &state.messages,
            i64::from(order) + 1,
            scheduler.questions_per_phase(),
        );
        let context = QuestionContext {
            element_id,
            order,
            element_name: info.name,
            element_description: info.description,
        };

        let text = self
            .retry
            .run("generate_question", || {
                self.generator.generate_question(&history, &context)
            })
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ConversationError::invalid_response("Generated question is empty")
                .with_detail("display_order", order));
        }

        tracing::debug!(
            session_id = %state.session_id,
            order,
            element_id = %element_id,
            history_len = history.len(),
            "Generated question"
        );
        Ok(QuestionDraft {
            text: text.to_string(),
            element_id,
            display_order: order,
            model_version: self.generator.model_version(),
            canned: false,
        })
    }

    /// Persists the pending answer and the drafted question, then records the
    /// question on `state`. Nothing touches `state` until both writes succeed.
    pub async fn commit(
        &self,
        state: &mut ChatState,
        draft: QuestionDraft,
        answer: Option<&str>,
    ) -> Result<QuestionId, ConversationError> {
        if let (Some(answer), Some(pending_id)) = (answer, state.pending_question_id()) {
            self.questions.save_answer(&pending_id, answer).await?;
        }

        let question_id = self
            .questions
            .save_question(NewQuestion {
                session_id: state.session_id,
                element_id: draft.element_id,
                display_order: draft.display_order,
                text: draft.text.clone(),
                model_version: draft.model_version,
            })
            .await?;

        state.record_question(question_id, draft.text);
        Ok(question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError, PromptedGenerator};
    use crate::adapters::elements::CatalogElementRepository;
    use crate::adapters::memory::InMemoryQuestionRepository;
    use crate::application::retry::RecordingSleeper;
    use crate::domain::assessment::BUILTIN_ELEMENTS;
    use crate::domain::foundation::{SessionId, UserId};
    use crate::ports::GenerationError;

    struct Fixture {
        provider: MockAIProvider,
        questions: InMemoryQuestionRepository,
        generator: QuestionGenerator,
    }

    fn fixture() -> Fixture {
        let provider = MockAIProvider::new();
        let questions = InMemoryQuestionRepository::new();
        let generator = QuestionGenerator::new(
            Arc::new(PromptedGenerator::new(Arc::new(provider.clone()))),
            Arc::new(CatalogElementRepository::builtin(2)),
            Arc::new(questions.clone()),
            RetryPolicy::new().with_sleeper(Arc::new(RecordingSleeper::new())),
        );
        Fixture {
            provider,
            questions,
            generator,
        }
    }

    fn scheduler() -> PhaseScheduler {
        PhaseScheduler::standard(2, 4).unwrap()
    }

    fn new_state() -> ChatState {
        ChatState::new(UserId::new("alice").unwrap(), SessionId::new())
    }

    #[tokio::test]
    async fn phase_start_uses_canned_opener_without_generation() {
        let f = fixture();
        let draft = f.generator.draft(&new_state(), &scheduler()).await.unwrap();

        assert!(draft.canned);
        assert_eq!(draft.model_version, CANNED_MODEL_VERSION);
        assert_eq!(draft.element_id, ElementId::FIRST);
        assert!(BUILTIN_ELEMENTS[0].initial_questions.contains(&draft.text));
        assert_eq!(f.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn seeded_first_phase_uses_seed_element_pool() {
        let f = fixture();
        let state = new_state().with_seed_element(ElementId::new(3).unwrap());

        let draft = f.generator.draft(&state, &scheduler()).await.unwrap();

        assert_eq!(draft.element_id.value(), 3);
        assert!(BUILTIN_ELEMENTS[2].initial_questions.contains(&draft.text));
    }

    #[tokio::test]
    async fn mid_phase_generates_with_windowed_history() {
        let f = fixture();
        f.provider.push_response("  What else drains you?  ");
        let mut state = new_state();
        state.record_question(QuestionId::new(), "opener");
        state.push_user("my answer");

        let draft = f.generator.draft(&state, &scheduler()).await.unwrap();

        assert!(!draft.canned);
        assert_eq!(draft.text, "What else drains you?");
        assert_eq!(draft.model_version, "mock-model-1");
        let prompt = &f.provider.get_calls()[0].messages[0].content;
        assert!(prompt.contains("assistant: opener\nuser: my answer"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let f = fixture();
        f.provider.push_error(MockError::Timeout { timeout_secs: 5 });
        f.provider.push_response("second try");
        let mut state = new_state();
        state.record_question(QuestionId::new(), "opener");
        state.push_user("answer");

        let draft = f.generator.draft(&state, &scheduler()).await.unwrap();

        assert_eq!(draft.text, "second try");
        assert_eq!(f.provider.call_count(), 2);
    }

    #[tokio::test]
    async fn non_transient_failure_surfaces_as_generation_error() {
        let f = fixture();
        f.provider.push_error(MockError::AuthenticationFailed);
        let mut state = new_state();
        state.record_question(QuestionId::new(), "opener");
        state.push_user("answer");

        let err = f.generator.draft(&state, &scheduler()).await.unwrap_err();

        assert!(matches!(err, ConversationError::Generation(GenerationError::Other(_))));
        assert_eq!(f.provider.call_count(), 1);
    }

    #[tokio::test]
    async fn blank_generation_is_invalid_response() {
        let f = fixture();
        f.provider.push_response("   ");
        let mut state = new_state();
        state.record_question(QuestionId::new(), "opener");
        state.push_user("answer");

        let err = f.generator.draft(&state, &scheduler()).await.unwrap_err();

        assert!(matches!(err, ConversationError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn commit_saves_answer_to_pending_question_then_new_question() {
        let f = fixture();
        let mut state = new_state();
        let first = f.generator.draft(&state, &scheduler()).await.unwrap();
        let first_id = f.generator.commit(&mut state, first, None).await.unwrap();
        state.push_user("answer one");

        f.provider.push_response("follow-up?");
        let second = f.generator.draft(&state, &scheduler()).await.unwrap();
        let second_id = f
            .generator
            .commit(&mut state, second, Some("answer one"))
            .await
            .unwrap();

        assert_eq!(state.next_display_order, 2);
        assert_eq!(state.pending_question_id(), Some(second_id));
        let answer = f.questions.find_answer_by_question(&first_id).await.unwrap().unwrap();
        assert_eq!(answer.text, "answer one");
        let stored = f.questions.find_questions_by_session(&state.session_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].display_order, 1);
    }
}
