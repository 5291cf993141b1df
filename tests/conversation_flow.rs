//! End-to-end conversation flows over the in-memory adapters.
//!
//! The mock provider answers every prompt with a numbered fallback, so a full
//! assessment runs without scripting individual responses. Retries use the
//! recording sleeper and never wait.

use std::sync::Arc;
use std::time::Duration;

use diagnosis_chat::adapters::ai::{MockAIProvider, MockError, PromptedGenerator};
use diagnosis_chat::adapters::elements::CatalogElementRepository;
use diagnosis_chat::adapters::memory::{
    InMemoryQuestionRepository, InMemoryReportRepository, InMemorySessionRepository,
};
use diagnosis_chat::adapters::storage::InMemoryStateStorage;
use diagnosis_chat::application::conversation::{
    ConversationError, ConversationPorts, ConversationService, ConversationSettings,
    ConversationTurn,
};
use diagnosis_chat::application::retry::{RecordingSleeper, RetryPolicy};
use diagnosis_chat::domain::assessment::ConversationPhase;
use diagnosis_chat::domain::foundation::{ErrorCode, SessionStatus, UserId};
use diagnosis_chat::ports::{SessionRepository, StateStorage};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    provider: MockAIProvider,
    sleeper: Arc<RecordingSleeper>,
    sessions: InMemorySessionRepository,
    states: InMemoryStateStorage,
    service: ConversationService,
}

impl TestApp {
    fn new(questions_per_phase: u32) -> Self {
        let provider = MockAIProvider::new();
        let sleeper = Arc::new(RecordingSleeper::new());
        let sessions = InMemorySessionRepository::new();
        let states = InMemoryStateStorage::new();

        let ports = ConversationPorts {
            generator: Arc::new(PromptedGenerator::new(Arc::new(provider.clone()))),
            sessions: Arc::new(sessions.clone()),
            questions: Arc::new(InMemoryQuestionRepository::new()),
            elements: Arc::new(CatalogElementRepository::builtin(questions_per_phase)),
            reports: Arc::new(InMemoryReportRepository::new()),
            states: Arc::new(states.clone()),
        };
        let service = ConversationService::new(
            ports,
            ConversationSettings::default(),
            RetryPolicy::new().with_sleeper(sleeper.clone()),
        );

        Self {
            provider,
            sleeper,
            sessions,
            states,
            service,
        }
    }

    async fn answer(&self, user: &UserId, text: &str) -> ConversationTurn {
        self.service
            .process_user_response(text, user)
            .await
            .unwrap()
    }

    /// Answers until `order` questions have been asked.
    async fn advance_to(&self, user: &UserId, order: u32) {
        let start = self.current_order(user).await;
        for n in start..order {
            self.answer(user, &format!("answer {}", n)).await;
        }
    }

    async fn current_order(&self, user: &UserId) -> u32 {
        let session = self.active_session(user).await;
        self.states
            .get_state(&session)
            .await
            .unwrap()
            .map_or(0, |s| s.next_display_order)
    }

    async fn active_session(&self, user: &UserId) -> diagnosis_chat::domain::foundation::SessionId {
        self.sessions
            .get_sessions_by_user(user, Some(SessionStatus::InProgress))
            .await
            .unwrap()[0]
    }
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

fn collector() -> UserId {
    UserId::new("data_collection_user").unwrap()
}

// =============================================================================
// Standard Mode
// =============================================================================

#[tokio::test]
async fn full_assessment_walks_every_element_and_reaches_diagnosis() {
    let app = TestApp::new(10);
    let user = alice();

    let first = app.service.start_conversation(&user, None).await.unwrap();
    assert_eq!(first.as_question().unwrap().progress.total_questions, 40);

    let mut switches = Vec::new();
    for n in 1..40u32 {
        let turn = app.answer(&user, &format!("answer {}", n)).await;
        let question = turn.as_question().expect("question turn before the end");
        assert_eq!(question.progress.question_number, n + 1);
        assert_eq!(question.options.len(), 3);
        if question.is_element_switching {
            switches.push((question.progress.question_number, question.element_id.value()));
        }
    }
    assert_eq!(switches, vec![(11, 2), (21, 3), (31, 4)]);

    let calls_before_final = app.provider.call_count();
    let last = app.answer(&user, "final answer").await;

    assert_eq!(last.phase(), ConversationPhase::Diagnosis);
    assert_eq!(app.provider.call_count(), calls_before_final);

    let state = app
        .states
        .get_state(&last.session_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.answers.len(), 40);
    assert_eq!(state.answers.get(&40).map(String::as_str), Some("final answer"));

    // Further answers and restarts keep returning the diagnosis.
    let again = app.answer(&user, "one more").await;
    assert_eq!(again.phase(), ConversationPhase::Diagnosis);
    let resumed = app.service.start_conversation(&user, None).await.unwrap();
    assert_eq!(resumed.phase(), ConversationPhase::Diagnosis);

    let summary = app.service.complete_assessment(&user, false).await.unwrap();
    assert_eq!(summary.total_questions_answered, 40);
    assert!(!summary.forced);
}

#[tokio::test]
async fn generated_questions_only_see_their_own_phase() {
    let app = TestApp::new(3);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 4).await;
    app.provider.clear_calls();

    // Question 5 is the second of phase two; its prompt holds question 4 only.
    app.answer(&user, "phase two answer").await;

    let prompt = &app.provider.get_calls()[0].messages[0].content;
    assert!(prompt.contains("user: phase two answer"));
    assert!(!prompt.contains("answer 1"));
    assert!(!prompt.contains("answer 2"));
}

#[tokio::test]
async fn completing_early_reports_counts() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 12).await;

    let err = app
        .service
        .complete_assessment(&user, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConversationError::AssessmentIncomplete {
            answered: 12,
            required: 40
        }
    ));
    let response = err.to_response();
    assert_eq!(response.error_type, "ASSESSMENT_INCOMPLETE");
    assert_eq!(response.details.get("answered"), Some(&"12".to_string()));

    let forced = app.service.complete_assessment(&user, true).await.unwrap();
    assert!(forced.forced);
    let options = app.service.get_answer_options(&user).await.unwrap();
    assert!(options.data().is_none());
}

// =============================================================================
// Undo
// =============================================================================

#[tokio::test]
async fn undo_one_step_from_question_five() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 5).await;

    let summary = app.service.undo_last_answer(&user, 1).await.unwrap();

    assert_eq!(summary.next_display_order, 4);
    assert_eq!(summary.messages_removed, 2);
    let history = app.service.get_conversation_history(&user).await.unwrap();
    assert_eq!(history.data().unwrap().len(), 8);

    // Answering again continues from question 4.
    let turn = app.answer(&user, "different answer").await;
    assert_eq!(turn.as_question().unwrap().progress.question_number, 5);
}

#[tokio::test]
async fn undo_past_history_leaves_state_unchanged() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 4).await;
    let session = app.active_session(&user).await;
    let before = app.states.get_state(&session).await.unwrap().unwrap();

    let err = app.service.undo_last_answer(&user, 10).await.unwrap_err();

    match &err {
        ConversationError::InvalidResponse { details, .. } => {
            assert_eq!(details.get("requested_steps"), Some(&"10".to_string()));
            assert_eq!(details.get("available_steps"), Some(&"4".to_string()));
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
    let after = app.states.get_state(&session).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn undo_from_diagnosis_rewinds_one_round() {
    let app = TestApp::new(2);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 8).await;
    let done = app.answer(&user, "last").await;
    assert_eq!(done.phase(), ConversationPhase::Diagnosis);

    let summary = app.service.undo_last_answer(&user, 1).await.unwrap();

    assert_eq!(summary.next_display_order, 7);
    assert_eq!(summary.messages_removed, 2);
    assert!(summary.pending_question.is_some());
    let history = app.service.get_conversation_history(&user).await.unwrap();
    assert_eq!(history.data().unwrap().len(), 14);

    let turn = app.answer(&user, "changed my mind").await;
    assert_eq!(turn.as_question().unwrap().progress.question_number, 8);
    let turn = app.answer(&user, "last again").await;
    assert_eq!(turn.phase(), ConversationPhase::Diagnosis);
}

#[tokio::test]
async fn undo_from_diagnosis_cannot_exceed_asked_questions() {
    let app = TestApp::new(2);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 8).await;
    app.answer(&user, "last").await;
    let session = app.active_session(&user).await;
    let before = app.states.get_state(&session).await.unwrap().unwrap();

    let err = app.service.undo_last_answer(&user, 9).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidResponse);
    let after = app.states.get_state(&session).await.unwrap().unwrap();
    assert_eq!(before, after);
    assert_eq!(after.phase, ConversationPhase::Diagnosis);

    let summary = app.service.undo_last_answer(&user, 8).await.unwrap();
    assert_eq!(summary.next_display_order, 0);
    assert_eq!(summary.messages_removed, 16);
}

#[tokio::test]
async fn transcript_holds_two_messages_per_asked_question() {
    let app = TestApp::new(2);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();

    for n in 1..=8u32 {
        let history = app.service.get_conversation_history(&user).await.unwrap();
        let history = history.data().unwrap();
        assert_eq!(history.len(), 2 * n as usize, "at question {}", n);
        assert_eq!(history[0].content, "");
        app.answer(&user, &format!("answer {}", n)).await;
    }

    // The final answer moves to diagnosis without growing the transcript.
    let history = app.service.get_conversation_history(&user).await.unwrap();
    assert_eq!(history.data().unwrap().len(), 16);

    app.service.undo_last_answer(&user, 3).await.unwrap();
    let history = app.service.get_conversation_history(&user).await.unwrap();
    assert_eq!(history.data().unwrap().len(), 10);
    assert_eq!(app.current_order(&user).await, 5);
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn transient_failures_back_off_and_the_round_completes() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();

    app.provider.push_error(MockError::RateLimited { retry_after_secs: 1 });
    app.provider.push_error(MockError::Timeout { timeout_secs: 30 });
    let turn = app.answer(&user, "first answer").await;

    assert_eq!(turn.as_question().unwrap().progress.question_number, 2);
    assert_eq!(
        app.sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn exhausted_retries_surface_generation_error() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    for _ in 0..3 {
        app.provider.push_error(MockError::Timeout { timeout_secs: 30 });
    }

    let err = app
        .service
        .process_user_response("answer", &user)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::GenerationFailed);
    assert_eq!(app.current_order(&user).await, 1);
}

// =============================================================================
// Data Collection Mode
// =============================================================================

#[tokio::test]
async fn data_collection_always_opens_a_new_session() {
    let app = TestApp::new(10);
    let user = collector();

    let first = app.service.start_conversation(&user, None).await.unwrap();
    let second = app.service.start_conversation(&user, None).await.unwrap();

    assert_ne!(first.session_id(), second.session_id());
    let old = app
        .sessions
        .find_session(&first.session_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old.status(), SessionStatus::Completed);
    assert!(!second.as_question().unwrap().resumed);
}

#[tokio::test]
async fn data_collection_reports_set_progress() {
    let app = TestApp::new(10);
    let user = collector();

    let turn = app.service.start_conversation(&user, None).await.unwrap();
    let progress = turn.as_question().unwrap().data_collection.clone().unwrap();
    assert_eq!(progress.current_set, 1);
    assert_eq!(progress.question_in_set, 1);
    assert_eq!(progress.total_sets, 5);
    assert_eq!(progress.total_questions, 50);

    app.advance_to(&user, 10).await;
    let turn = app.answer(&user, "tenth").await;
    let question = turn.as_question().unwrap();
    let progress = question.data_collection.clone().unwrap();
    assert_eq!(progress.current_set, 2);
    assert_eq!(progress.question_in_set, 1);
    assert_eq!(progress.overall_question_number, 11);
    assert!(question.is_element_switching);

    // Completion is not gated on answered questions.
    let summary = app.service.complete_assessment(&user, false).await.unwrap();
    assert!(!summary.forced);
}

// =============================================================================
// Archive
// =============================================================================

#[tokio::test]
async fn archive_groups_answered_pairs_and_skips_short_sessions() {
    let app = TestApp::new(10);
    let user = alice();
    app.service.start_conversation(&user, None).await.unwrap();
    app.advance_to(&user, 6).await;
    app.service.complete_assessment(&user, true).await.unwrap();

    // A second, short session.
    app.service.start_conversation(&user, None).await.unwrap();

    let archive = app.service.get_conversation_histories(&user).await.unwrap();

    assert_eq!(archive.len(), 1);
    let elements = &archive[0].elements;
    assert_eq!(elements.len(), 4);
    // Five answered questions, the sixth still pending.
    assert_eq!(elements[0].len(), 10);
    assert!(elements[1..].iter().all(Vec::is_empty));
    assert_eq!(elements[0][1].content, "answer 1");
}
