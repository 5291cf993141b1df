//! Persisted records of asked questions, answers and diagnosis reports.

use serde::{Deserialize, Serialize};

use super::element::ElementId;
use crate::domain::foundation::{AnswerId, QuestionId, ReportId, SessionId, Timestamp, UserId};

/// Model version recorded for canned opening questions.
pub const CANNED_MODEL_VERSION: &str = "initial_question";

/// A question about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub session_id: SessionId,
    pub element_id: ElementId,
    /// 0-based, unique per session.
    pub display_order: u32,
    pub text: String,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub session_id: SessionId,
    pub element_id: ElementId,
    pub display_order: u32,
    pub text: String,
    pub model_version: String,
    pub created_at: Timestamp,
}

impl QuestionRecord {
    pub fn from_new(id: QuestionId, question: NewQuestion) -> Self {
        Self {
            id,
            session_id: question.session_id,
            element_id: question.element_id,
            display_order: question.display_order,
            text: question.text,
            model_version: question.model_version,
            created_at: Timestamp::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub timestamp: Timestamp,
}

/// A diagnosis written for one element of a user's assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub id: ReportId,
    pub user_id: UserId,
    pub element_id: ElementId,
    pub report: String,
    pub predicted_label: Option<String>,
    pub created_at: Timestamp,
}
