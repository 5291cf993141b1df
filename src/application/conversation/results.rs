//! Structured results returned by the conversation service.

use serde::Serialize;

use crate::domain::assessment::{
    AssessmentMode, ChatMessage, ConversationPhase, DataCollectionProgress, ElementId,
};
use crate::domain::foundation::{ReportId, SessionId};

/// Overall progress through an assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// `min(completed / total, 1.0)`
    pub progress: f64,
    /// 1-based number of the current question, clamped to `1..=total`.
    pub question_number: u32,
    pub completed_questions: u32,
    pub total_questions: u32,
}

impl Progress {
    pub fn new(completed: u32, total: u32) -> Self {
        let progress = if total == 0 {
            1.0
        } else {
            (f64::from(completed) / f64::from(total)).min(1.0)
        };
        Self {
            progress,
            question_number: completed.clamp(1, total.max(1)),
            completed_questions: completed,
            total_questions: total,
        }
    }
}

/// Outcome of starting or advancing a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ConversationTurn {
    Question(QuestionTurn),
    Diagnosis(DiagnosisTurn),
}

impl ConversationTurn {
    pub fn session_id(&self) -> SessionId {
        match self {
            ConversationTurn::Question(turn) => turn.session_id,
            ConversationTurn::Diagnosis(turn) => turn.session_id,
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        match self {
            ConversationTurn::Question(_) => ConversationPhase::Ask,
            ConversationTurn::Diagnosis(_) => ConversationPhase::Diagnosis,
        }
    }

    pub fn as_question(&self) -> Option<&QuestionTurn> {
        match self {
            ConversationTurn::Question(turn) => Some(turn),
            ConversationTurn::Diagnosis(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionTurn {
    pub session_id: SessionId,
    pub question: String,
    pub options: Vec<String>,
    pub element_id: ElementId,
    pub progress: Progress,
    /// True when an existing session was picked up without generating.
    pub resumed: bool,
    /// True when this question opens a new element phase.
    pub is_element_switching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection: Option<DataCollectionProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisTurn {
    pub session_id: SessionId,
    pub message: String,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection: Option<DataCollectionProgress>,
}

/// Read-only projection scoped to the user's in-progress session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionView<T> {
    Success { session_id: SessionId, data: T },
    NoActiveSession { message: String },
}

impl<T> SessionView<T> {
    pub fn no_active_session() -> Self {
        SessionView::NoActiveSession {
            message: "No active session found".to_string(),
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SessionView::Success { data, .. } => Some(data),
            SessionView::NoActiveSession { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            SessionView::Success { data, .. } => Some(data),
            SessionView::NoActiveSession { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub progress: Progress,
    pub element_id: ElementId,
    pub phase: ConversationPhase,
    pub mode: AssessmentMode,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub session_id: SessionId,
    pub total_questions_answered: u32,
    pub mode: AssessmentMode,
    /// Completed before every question was answered.
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoSummary {
    pub session_id: SessionId,
    pub steps_undone: u32,
    pub messages_removed: usize,
    pub next_display_order: u32,
    pub pending_question: Option<String>,
}

/// Question/answer pairs of one past session grouped by element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedConversation {
    pub session_id: SessionId,
    /// Index `i` holds the pairs of element `i + 1`.
    pub elements: Vec<Vec<ChatMessage>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedReport {
    pub report_id: ReportId,
    pub element_id: ElementId,
}
