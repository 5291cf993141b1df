//! Conversation service - the engine behind every user-facing operation.
//!
//! A round answers the pending question and asks the next one. The round is
//! built on a copy of the checkpoint and the checkpoint is only written once
//! the question and its options exist, so a failed round leaves the stored
//! conversation where it was.

use std::sync::Arc;

use super::errors::ConversationError;
use super::option_generator::{OptionGenerator, DEFAULT_OPTION_COUNT};
use super::question_generator::QuestionGenerator;
use super::results::{
    ArchivedConversation, CompletionSummary, ConversationTurn, DiagnosisTurn, Progress,
    ProgressReport, QuestionTurn, SavedReport, SessionView, UndoSummary,
};
use crate::application::retry::RetryPolicy;
use crate::config::AssessmentConfig;
use crate::domain::assessment::{
    filter_by_phase, validate_question_number, AssessmentMode, ChatMessage, ChatState,
    ConversationPhase, DataCollectionProgress, DiagnosisReport, ElementId, PhaseScheduler,
    DATA_COLLECTION_QUESTIONS_PER_SET, DATA_COLLECTION_TOTAL_SETS, DEFAULT_ELEMENT_COUNT,
};
use crate::domain::foundation::{SessionId, SessionStatus, UserId};
use crate::ports::{
    ElementRepository, GenerationPort, QuestionRepository, ReportRepository, SessionRepository,
    StateStorage,
};

/// Minimum questions a past session needs to appear in the archive.
pub const MIN_ARCHIVED_QUESTIONS: usize = 5;

const DIAGNOSIS_MESSAGE: &str = "All questions have been answered. Your diagnosis is ready.";

/// Everything the service talks to.
#[derive(Clone)]
pub struct ConversationPorts {
    pub generator: Arc<dyn GenerationPort>,
    pub sessions: Arc<dyn SessionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub elements: Arc<dyn ElementRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub states: Arc<dyn StateStorage>,
}

/// Assessment shape used by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSettings {
    pub element_count: u32,
    pub data_collection_user: String,
    pub data_collection_questions_per_set: u32,
    pub data_collection_total_sets: u32,
    pub option_count: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            element_count: DEFAULT_ELEMENT_COUNT,
            data_collection_user: "data_collection_user".to_string(),
            data_collection_questions_per_set: DATA_COLLECTION_QUESTIONS_PER_SET,
            data_collection_total_sets: DATA_COLLECTION_TOTAL_SETS,
            option_count: DEFAULT_OPTION_COUNT,
        }
    }
}

impl ConversationSettings {
    pub fn from_config(config: &AssessmentConfig) -> Self {
        Self {
            element_count: config.element_count,
            data_collection_user: config.data_collection_user.clone(),
            data_collection_questions_per_set: config.data_collection_questions_per_set,
            data_collection_total_sets: config.data_collection_total_sets,
            option_count: config.option_count,
        }
    }

    pub fn with_element_count(mut self, element_count: u32) -> Self {
        self.element_count = element_count;
        self
    }
}

pub struct ConversationService {
    ports: ConversationPorts,
    settings: ConversationSettings,
    questions: QuestionGenerator,
    options: OptionGenerator,
}

impl ConversationService {
    pub fn new(ports: ConversationPorts, settings: ConversationSettings, retry: RetryPolicy) -> Self {
        let questions = QuestionGenerator::new(
            ports.generator.clone(),
            ports.elements.clone(),
            ports.questions.clone(),
            retry.clone(),
        );
        let options = OptionGenerator::new(ports.generator.clone(), retry)
            .with_option_count(settings.option_count);
        Self {
            ports,
            settings,
            questions,
            options,
        }
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub fn mode_for(&self, user_id: &UserId) -> AssessmentMode {
        AssessmentMode::for_user(user_id, &self.settings.data_collection_user)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Conversation flow
    // ════════════════════════════════════════════════════════════════════════

    /// Starts a conversation or resumes the user's in-progress one.
    ///
    /// Data-collection users always get a fresh session; any open one is
    /// closed first. `element_id` seeds the first phase of a new session and
    /// is clamped into range.
    pub async fn start_conversation(
        &self,
        user_id: &UserId,
        element_id: Option<i64>,
    ) -> Result<ConversationTurn, ConversationError> {
        tracing::info!(user_id = %user_id, ?element_id, "Starting conversation");
        let result = self.start_inner(user_id, element_id).await;
        conclude("start conversation", user_id, result)
    }

    /// Records an answer to the pending question and asks the next one.
    pub async fn process_user_response(
        &self,
        user_input: &str,
        user_id: &UserId,
    ) -> Result<ConversationTurn, ConversationError> {
        tracing::info!(user_id = %user_id, input_len = user_input.len(), "Processing user response");
        let result = self.respond_inner(user_input, user_id).await;
        conclude("process user response", user_id, result)
    }

    /// Candidate answers for the pending question.
    pub async fn get_answer_options(
        &self,
        user_id: &UserId,
    ) -> Result<SessionView<Vec<String>>, ConversationError> {
        let result = self
            .view(user_id, |state, _| {
                state.map(|s| s.options.clone()).unwrap_or_default()
            })
            .await;
        conclude("get answer options", user_id, result)
    }

    pub async fn get_conversation_progress(
        &self,
        user_id: &UserId,
    ) -> Result<SessionView<ProgressReport>, ConversationError> {
        let mode = self.mode_for(user_id);
        let result = self
            .view(user_id, |state, scheduler| {
                let order = state.map_or(0, |s| s.next_display_order);
                ProgressReport {
                    progress: Progress::new(order, scheduler.total_questions()),
                    element_id: state.map_or(ElementId::FIRST, |s| {
                        s.personality_element_id(scheduler)
                    }),
                    phase: state.map_or(ConversationPhase::Ask, |s| s.phase),
                    mode,
                    is_complete: scheduler.is_complete(i64::from(order)),
                }
            })
            .await;
        conclude("get conversation progress", user_id, result)
    }

    /// Transcript of the in-progress session.
    pub async fn get_conversation_history(
        &self,
        user_id: &UserId,
    ) -> Result<SessionView<Vec<ChatMessage>>, ConversationError> {
        let result = self
            .view(user_id, |state, _| {
                state.map(|s| s.messages.clone()).unwrap_or_default()
            })
            .await;
        conclude("get conversation history", user_id, result)
    }

    /// Closes the in-progress session.
    ///
    /// Standard mode requires every question answered unless `force` is set.
    pub async fn complete_assessment(
        &self,
        user_id: &UserId,
        force: bool,
    ) -> Result<CompletionSummary, ConversationError> {
        tracing::info!(user_id = %user_id, force, "Completing assessment");
        let result = self.complete_inner(user_id, force).await;
        conclude("complete assessment", user_id, result)
    }

    /// Rewinds the conversation by `steps` rounds.
    pub async fn undo_last_answer(
        &self,
        user_id: &UserId,
        steps: u32,
    ) -> Result<UndoSummary, ConversationError> {
        tracing::info!(user_id = %user_id, steps, "Undoing answers");
        let result = self.undo_inner(user_id, steps).await;
        conclude("undo last answer", user_id, result)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Archive and reports
    // ════════════════════════════════════════════════════════════════════════

    /// Answered question pairs of every substantial past session, per element.
    pub async fn get_conversation_histories(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ArchivedConversation>, ConversationError> {
        let result = self.histories_inner(user_id).await;
        conclude("get conversation histories", user_id, result)
    }

    pub async fn save_report(
        &self,
        user_id: &UserId,
        element_id: i64,
        report: &str,
        predicted_label: Option<&str>,
    ) -> Result<SavedReport, ConversationError> {
        let result = self
            .save_report_inner(user_id, element_id, report, predicted_label)
            .await;
        conclude("save report", user_id, result)
    }

    /// Most recent report for the element, if any.
    pub async fn restore_report(
        &self,
        user_id: &UserId,
        element_id: i64,
    ) -> Result<Option<DiagnosisReport>, ConversationError> {
        let element = ElementId::clamped(element_id, self.settings.element_count);
        let result = self
            .ports
            .reports
            .find_reports_by_user(user_id)
            .await
            .map(|reports| reports.into_iter().find(|r| r.element_id == element))
            .map_err(ConversationError::from);
        conclude("restore report", user_id, result)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Operation bodies
    // ════════════════════════════════════════════════════════════════════════

    async fn start_inner(
        &self,
        user_id: &UserId,
        element_id: Option<i64>,
    ) -> Result<ConversationTurn, ConversationError> {
        let mode = self.mode_for(user_id);
        let scheduler = self.scheduler(mode).await?;

        if let Some(session_id) = self.active_session(user_id).await? {
            if !mode.is_data_collection() {
                return self.resume(session_id, user_id, &scheduler, mode).await;
            }
            self.ports.sessions.close_session(&session_id).await?;
            tracing::info!(
                user_id = %user_id,
                session_id = %session_id,
                "Closed previous data-collection session"
            );
        }

        let session_id = self.ports.sessions.create_session(user_id).await?;
        let mut state = ChatState::new(user_id.clone(), session_id);
        if let Some(requested) = element_id {
            let seed = ElementId::clamped(requested, scheduler.element_count());
            if i64::from(seed.value()) != requested {
                tracing::warn!(requested, clamped = %seed, "Seed element out of range, clamped");
            }
            state = state.with_seed_element(seed);
        }

        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            mode = ?mode,
            "Created session"
        );
        self.run_round(state, None, &scheduler, mode).await
    }

    async fn resume(
        &self,
        session_id: SessionId,
        user_id: &UserId,
        scheduler: &PhaseScheduler,
        mode: AssessmentMode,
    ) -> Result<ConversationTurn, ConversationError> {
        let state = self.ports.states.get_state(&session_id).await?;

        match state {
            Some(state) if state.phase == ConversationPhase::Diagnosis => {
                self.diagnosis_turn(&state, scheduler, mode).await
            }
            Some(state) if state.pending_question.is_some() => {
                tracing::info!(
                    user_id = %user_id,
                    session_id = %session_id,
                    order = state.next_display_order,
                    "Resuming session"
                );
                self.question_turn(&state, scheduler, mode, true).await
            }
            Some(state) => self.run_round(state, None, scheduler, mode).await,
            None => {
                tracing::warn!(
                    session_id = %session_id,
                    "In-progress session has no checkpoint, starting first round"
                );
                let state = ChatState::new(user_id.clone(), session_id);
                self.run_round(state, None, scheduler, mode).await
            }
        }
    }

    async fn respond_inner(
        &self,
        user_input: &str,
        user_id: &UserId,
    ) -> Result<ConversationTurn, ConversationError> {
        let mode = self.mode_for(user_id);
        let scheduler = self.scheduler(mode).await?;
        let session_id = self
            .active_session(user_id)
            .await?
            .ok_or_else(|| ConversationError::session_not_found(user_id))?;

        let input = user_input.trim();
        if input.is_empty() {
            return Err(ConversationError::invalid_response("Answer cannot be empty"));
        }

        let Some(mut state) = self.ports.states.get_state(&session_id).await? else {
            tracing::warn!(session_id = %session_id, "No checkpoint, answer ignored");
            let state = ChatState::new(user_id.clone(), session_id);
            return self.run_round(state, None, &scheduler, mode).await;
        };

        if state.phase == ConversationPhase::Diagnosis {
            return self.diagnosis_turn(&state, &scheduler, mode).await;
        }
        if state.pending_question.is_none() {
            return self.run_round(state, None, &scheduler, mode).await;
        }

        if scheduler.is_complete(i64::from(state.next_display_order)) {
            if let Some(pending_id) = state.pending_question_id() {
                self.ports.questions.save_answer(&pending_id, input).await?;
            }
            state.answers.insert(state.next_display_order, input.to_string());
            state.phase = ConversationPhase::Diagnosis;
            state.options.clear();
            self.save_state(&mut state).await?;
            tracing::info!(
                user_id = %user_id,
                session_id = %session_id,
                answered = state.answers.len(),
                "All questions answered"
            );
            return self.diagnosis_turn(&state, &scheduler, mode).await;
        }

        self.run_round(state, Some(input), &scheduler, mode).await
    }

    async fn complete_inner(
        &self,
        user_id: &UserId,
        force: bool,
    ) -> Result<CompletionSummary, ConversationError> {
        let mode = self.mode_for(user_id);
        let scheduler = self.scheduler(mode).await?;
        let session_id = self
            .active_session(user_id)
            .await?
            .ok_or_else(|| ConversationError::session_not_found(user_id))?;

        let answered = self
            .ports
            .states
            .get_state(&session_id)
            .await?
            .map_or(0, |s| s.next_display_order);
        let required = scheduler.total_questions();

        if mode.requires_full_answers() && !force && answered < required {
            return Err(ConversationError::AssessmentIncomplete { answered, required });
        }

        self.ports.sessions.close_session(&session_id).await?;
        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            answered,
            forced = force,
            "Assessment completed"
        );

        Ok(CompletionSummary {
            session_id,
            total_questions_answered: answered,
            mode,
            forced: force && answered < required,
        })
    }

    async fn undo_inner(
        &self,
        user_id: &UserId,
        steps: u32,
    ) -> Result<UndoSummary, ConversationError> {
        let session_id = self
            .active_session(user_id)
            .await?
            .ok_or_else(|| ConversationError::session_not_found(user_id))?;
        let mut state = self
            .ports
            .states
            .get_state(&session_id)
            .await?
            .ok_or_else(|| ConversationError::invalid_response("No conversation to undo"))?;

        let cannot_undo = |state: &ChatState| {
            ConversationError::invalid_response(format!(
                "Cannot undo {} steps, only {} available",
                steps, state.next_display_order
            ))
            .with_detail("requested_steps", steps)
            .with_detail("available_steps", state.next_display_order)
        };

        let outcome = state.undo(steps).map_err(|_| cannot_undo(&state))?;

        self.save_state(&mut state).await?;
        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            steps,
            order = state.next_display_order,
            "Undo applied"
        );

        Ok(UndoSummary {
            session_id,
            steps_undone: steps,
            messages_removed: outcome.messages_removed,
            next_display_order: outcome.next_display_order,
            pending_question: state.pending_question.clone(),
        })
    }

    async fn histories_inner(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ArchivedConversation>, ConversationError> {
        let element_count = self.settings.element_count;
        let session_ids = self
            .ports
            .sessions
            .get_sessions_by_user(user_id, None)
            .await?;

        let mut archive = Vec::new();
        for session_id in session_ids {
            let questions = self
                .ports
                .questions
                .find_questions_by_session(&session_id)
                .await?;
            if questions.len() < MIN_ARCHIVED_QUESTIONS {
                continue;
            }

            let mut elements = vec![Vec::new(); element_count as usize];
            for question in questions {
                let Some(answer) = self
                    .ports
                    .questions
                    .find_answer_by_question(&question.id)
                    .await?
                else {
                    continue;
                };
                let element = ElementId::clamped(i64::from(question.element_id.value()), element_count);
                let bucket = &mut elements[element.index()];
                bucket.push(ChatMessage::assistant(question.text));
                bucket.push(ChatMessage::user(answer.text));
            }
            archive.push(ArchivedConversation {
                session_id,
                elements,
            });
        }

        tracing::debug!(user_id = %user_id, sessions = archive.len(), "Loaded conversation archive");
        Ok(archive)
    }

    async fn save_report_inner(
        &self,
        user_id: &UserId,
        element_id: i64,
        report: &str,
        predicted_label: Option<&str>,
    ) -> Result<SavedReport, ConversationError> {
        if report.trim().is_empty() {
            return Err(ConversationError::invalid_response("Report cannot be empty"));
        }
        let element = ElementId::clamped(element_id, self.settings.element_count);
        let report_id = self
            .ports
            .reports
            .save_report(user_id, element, report, predicted_label)
            .await?;
        tracing::info!(user_id = %user_id, element_id = %element, report_id = %report_id, "Saved report");
        Ok(SavedReport {
            report_id,
            element_id: element,
        })
    }

    // ════════════════════════════════════════════════════════════════════════
    // Rounds
    // ════════════════════════════════════════════════════════════════════════

    /// Answers the pending question (if `answer` is given), asks the next one
    /// and generates its options. `state` is only persisted at the end.
    async fn run_round(
        &self,
        mut state: ChatState,
        answer: Option<&str>,
        scheduler: &PhaseScheduler,
        mode: AssessmentMode,
    ) -> Result<ConversationTurn, ConversationError> {
        match answer {
            Some(answer) => {
                state.push_user(answer);
                state.answers.insert(state.next_display_order, answer.to_string());
            }
            None => state.open_transcript(),
        }

        let draft = self.questions.draft(&state, scheduler).await?;
        self.questions.commit(&mut state, draft, answer).await?;

        let context = option_context(&state, scheduler);
        let options = self.options.generate(&context).await?;
        state.replace_options(options);
        state.phase = ConversationPhase::Ask;

        self.save_state(&mut state).await?;
        self.question_turn(&state, scheduler, mode, false).await
    }

    async fn question_turn(
        &self,
        state: &ChatState,
        scheduler: &PhaseScheduler,
        mode: AssessmentMode,
        resumed: bool,
    ) -> Result<ConversationTurn, ConversationError> {
        let number = state.next_display_order;
        let element_id = state.personality_element_id(scheduler);
        let is_element_switching = number > 1 && scheduler.is_phase_start(i64::from(number) - 1);

        Ok(ConversationTurn::Question(QuestionTurn {
            session_id: state.session_id,
            question: state.pending_question.clone().unwrap_or_default(),
            options: state.options.clone(),
            element_id,
            progress: Progress::new(number, scheduler.total_questions()),
            resumed,
            is_element_switching,
            data_collection: self
                .data_collection_progress(number, scheduler, element_id, mode)
                .await?,
        }))
    }

    async fn diagnosis_turn(
        &self,
        state: &ChatState,
        scheduler: &PhaseScheduler,
        mode: AssessmentMode,
    ) -> Result<ConversationTurn, ConversationError> {
        let number = state.next_display_order;
        let element_id = state.personality_element_id(scheduler);
        Ok(ConversationTurn::Diagnosis(DiagnosisTurn {
            session_id: state.session_id,
            message: DIAGNOSIS_MESSAGE.to_string(),
            progress: Progress::new(number, scheduler.total_questions()),
            data_collection: self
                .data_collection_progress(number, scheduler, element_id, mode)
                .await?,
        }))
    }

    async fn data_collection_progress(
        &self,
        number: u32,
        scheduler: &PhaseScheduler,
        element_id: ElementId,
        mode: AssessmentMode,
    ) -> Result<Option<DataCollectionProgress>, ConversationError> {
        if !mode.is_data_collection() {
            return Ok(None);
        }
        let number = validate_question_number(i64::from(number), scheduler)?;
        let info = self.ports.elements.get_element_info(element_id).await?;
        Ok(Some(DataCollectionProgress::new(
            number, scheduler, element_id, info.label,
        )))
    }

    // ════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════

    async fn scheduler(&self, mode: AssessmentMode) -> Result<PhaseScheduler, ConversationError> {
        let scheduler = match mode {
            AssessmentMode::Standard => {
                let per_phase = self.ports.elements.get_questions_per_phase().await?;
                PhaseScheduler::standard(per_phase, self.settings.element_count)?
            }
            AssessmentMode::DataCollection => PhaseScheduler::new(
                self.settings.data_collection_questions_per_set,
                self.settings.element_count,
                self.settings.data_collection_total_sets,
            )?,
        };
        Ok(scheduler)
    }

    async fn active_session(&self, user_id: &UserId) -> Result<Option<SessionId>, ConversationError> {
        let sessions = self
            .ports
            .sessions
            .get_sessions_by_user(user_id, Some(SessionStatus::InProgress))
            .await?;
        Ok(sessions.into_iter().next())
    }

    async fn save_state(&self, state: &mut ChatState) -> Result<(), ConversationError> {
        let revision = self
            .ports
            .states
            .update_state(&state.session_id, state)
            .await?;
        state.revision = revision;
        Ok(())
    }

    async fn view<T>(
        &self,
        user_id: &UserId,
        project: impl FnOnce(Option<&ChatState>, &PhaseScheduler) -> T,
    ) -> Result<SessionView<T>, ConversationError> {
        let Some(session_id) = self.active_session(user_id).await? else {
            return Ok(SessionView::no_active_session());
        };
        let scheduler = self.scheduler(self.mode_for(user_id)).await?;
        let state = self.ports.states.get_state(&session_id).await?;
        Ok(SessionView::Success {
            session_id,
            data: project(state.as_ref(), &scheduler),
        })
    }
}

/// The pending question's phase window followed by the question itself.
fn option_context(state: &ChatState, scheduler: &PhaseScheduler) -> Vec<ChatMessage> {
    let mut context = filter_by_phase(
        &state.messages,
        i64::from(state.next_display_order),
        scheduler.questions_per_phase(),
    );
    if let Some(question) = &state.pending_question {
        context.push(ChatMessage::assistant(question.clone()));
    }
    context
}

fn conclude<T>(
    operation: &str,
    user_id: &UserId,
    result: Result<T, ConversationError>,
) -> Result<T, ConversationError> {
    result.map_err(|err| {
        let sealed = err.seal(operation, user_id);
        tracing::warn!(
            user_id = %user_id,
            operation,
            code = %sealed.code(),
            error = %sealed,
            "Operation failed"
        );
        sealed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError, PromptedGenerator};
    use crate::adapters::elements::CatalogElementRepository;
    use crate::adapters::memory::{
        InMemoryQuestionRepository, InMemoryReportRepository, InMemorySessionRepository,
    };
    use crate::adapters::storage::InMemoryStateStorage;
    use crate::application::retry::RecordingSleeper;
    use crate::domain::foundation::ErrorCode;

    struct Harness {
        provider: MockAIProvider,
        states: InMemoryStateStorage,
        questions: InMemoryQuestionRepository,
        sessions: InMemorySessionRepository,
        service: ConversationService,
    }

    fn harness(questions_per_phase: u32) -> Harness {
        let provider = MockAIProvider::new();
        let states = InMemoryStateStorage::new();
        let questions = InMemoryQuestionRepository::new();
        let sessions = InMemorySessionRepository::new();
        let ports = ConversationPorts {
            generator: Arc::new(PromptedGenerator::new(Arc::new(provider.clone()))),
            sessions: Arc::new(sessions.clone()),
            questions: Arc::new(questions.clone()),
            elements: Arc::new(CatalogElementRepository::builtin(questions_per_phase)),
            reports: Arc::new(InMemoryReportRepository::new()),
            states: Arc::new(states.clone()),
        };
        let service = ConversationService::new(
            ports,
            ConversationSettings::default(),
            RetryPolicy::new().with_sleeper(Arc::new(RecordingSleeper::new())),
        );
        Harness {
            provider,
            states,
            questions,
            sessions,
            service,
        }
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn first_round_uses_canned_opener_and_three_options() {
        let h = harness(2);
        let turn = h.service.start_conversation(&alice(), None).await.unwrap();

        let question = turn.as_question().unwrap();
        assert_eq!(question.options.len(), 3);
        assert_eq!(question.element_id, ElementId::FIRST);
        assert!(!question.resumed);
        assert_eq!(question.progress.question_number, 1);
        // Opener is canned, so only option calls reach the model.
        assert_eq!(h.provider.call_count(), 3);

        let state = h.states.get_state(&turn.session_id()).await.unwrap().unwrap();
        assert_eq!(state.next_display_order, 1);
        assert_eq!(state.revision, 1);
    }

    #[tokio::test]
    async fn second_start_resumes_without_generating() {
        let h = harness(2);
        let first = h.service.start_conversation(&alice(), None).await.unwrap();
        let calls = h.provider.call_count();

        let second = h.service.start_conversation(&alice(), None).await.unwrap();

        assert_eq!(first.session_id(), second.session_id());
        assert!(second.as_question().unwrap().resumed);
        assert_eq!(
            second.as_question().unwrap().question,
            first.as_question().unwrap().question
        );
        assert_eq!(h.provider.call_count(), calls);
    }

    #[tokio::test]
    async fn answer_is_saved_against_the_question_it_answers() {
        let h = harness(2);
        let first = h.service.start_conversation(&alice(), None).await.unwrap();
        h.service
            .process_user_response("I recharge alone", &alice())
            .await
            .unwrap();

        let stored = h
            .questions
            .find_questions_by_session(&first.session_id())
            .await
            .unwrap();
        let answer = h
            .questions
            .find_answer_by_question(&stored[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer.text, "I recharge alone");
        assert_eq!(stored[0].text, first.as_question().unwrap().question);
    }

    #[tokio::test]
    async fn reanswering_after_undo_replaces_the_stored_answer() {
        let h = harness(2);
        let first = h.service.start_conversation(&alice(), None).await.unwrap();
        h.service.process_user_response("first try", &alice()).await.unwrap();
        h.service.undo_last_answer(&alice(), 1).await.unwrap();

        h.service.process_user_response("second try", &alice()).await.unwrap();

        let stored = h
            .questions
            .find_questions_by_session(&first.session_id())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(h.questions.answer_count().await, 1);
        let answer = h
            .questions
            .find_answer_by_question(&stored[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer.text, "second try");
    }

    #[tokio::test]
    async fn blank_answer_is_rejected_without_touching_state() {
        let h = harness(2);
        let turn = h.service.start_conversation(&alice(), None).await.unwrap();

        let err = h
            .service
            .process_user_response("   ", &alice())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidResponse);
        let state = h.states.get_state(&turn.session_id()).await.unwrap().unwrap();
        assert_eq!(state.next_display_order, 1);
    }

    #[tokio::test]
    async fn failed_round_leaves_checkpoint_unchanged() {
        let h = harness(2);
        let turn = h.service.start_conversation(&alice(), None).await.unwrap();
        h.provider.push_error(MockError::AuthenticationFailed);

        let err = h
            .service
            .process_user_response("answer", &alice())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::GenerationFailed);
        let state = h.states.get_state(&turn.session_id()).await.unwrap().unwrap();
        assert_eq!(state.next_display_order, 1);
        assert_eq!(state.messages.len(), 2);
        assert!(state.answers.is_empty());
    }

    #[tokio::test]
    async fn seed_element_is_clamped() {
        let h = harness(2);
        let turn = h.service.start_conversation(&alice(), Some(9)).await.unwrap();
        assert_eq!(turn.as_question().unwrap().element_id.value(), 4);
    }

    #[tokio::test]
    async fn operations_without_session_report_it() {
        let h = harness(2);

        let err = h
            .service
            .process_user_response("hello", &alice())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionNotFound);

        let options = h.service.get_answer_options(&alice()).await.unwrap();
        assert!(options.data().is_none());
        let err = h.service.undo_last_answer(&alice(), 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn progress_view_tracks_order() {
        let h = harness(2);
        h.service.start_conversation(&alice(), None).await.unwrap();
        h.service.process_user_response("a1", &alice()).await.unwrap();

        let view = h.service.get_conversation_progress(&alice()).await.unwrap();
        let report = view.data().unwrap();
        assert_eq!(report.progress.question_number, 2);
        assert_eq!(report.mode, AssessmentMode::Standard);
        assert!(!report.is_complete);

        let history = h.service.get_conversation_history(&alice()).await.unwrap();
        let history = history.data().unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::user(""));
    }

    #[tokio::test]
    async fn forced_completion_closes_session() {
        let h = harness(2);
        let turn = h.service.start_conversation(&alice(), None).await.unwrap();

        let summary = h.service.complete_assessment(&alice(), true).await.unwrap();

        assert!(summary.forced);
        assert_eq!(summary.total_questions_answered, 1);
        let session = h.sessions.find_session(&turn.session_id()).await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn undo_of_zero_steps_is_rejected() {
        let h = harness(2);
        h.service.start_conversation(&alice(), None).await.unwrap();

        let err = h.service.undo_last_answer(&alice(), 0).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn reports_round_trip_by_element() {
        let h = harness(2);
        h.service
            .save_report(&alice(), 2, "first", None)
            .await
            .unwrap();
        h.service
            .save_report(&alice(), 2, "second", Some("N"))
            .await
            .unwrap();

        let restored = h.service.restore_report(&alice(), 2).await.unwrap().unwrap();
        assert_eq!(restored.report, "second");
        assert_eq!(restored.predicted_label.as_deref(), Some("N"));
        assert!(h.service.restore_report(&alice(), 1).await.unwrap().is_none());

        let err = h.service.save_report(&alice(), 1, "  ", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }

    #[test]
    fn option_context_ends_with_pending_question() {
        let scheduler = PhaseScheduler::standard(2, 4).unwrap();
        let mut state = ChatState::new(alice(), SessionId::new());
        state.record_question(crate::domain::foundation::QuestionId::new(), "q1");
        state.push_user("a1");
        state.record_question(crate::domain::foundation::QuestionId::new(), "q2");

        let context = option_context(&state, &scheduler);
        let contents: Vec<_> = context.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2"]);

        state.push_user("a2");
        state.record_question(crate::domain::foundation::QuestionId::new(), "q3");
        let context = option_context(&state, &scheduler);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].content, "q3");
    }
}
