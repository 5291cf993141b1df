//! Assessment modes and the data-collection progress projection.

use serde::{Deserialize, Serialize};

use super::element::ElementId;
use super::scheduler::PhaseScheduler;
use crate::domain::foundation::{UserId, ValidationError};

/// Which numbering policy a user's sessions follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentMode {
    /// Interactive: one phase per element, resumable sessions.
    Standard,
    /// Bulk labelling by a fixed pseudo-user; every start opens a new session.
    DataCollection,
}

impl AssessmentMode {
    /// Data collection when `user_id` is the configured pseudo-user.
    pub fn for_user(user_id: &UserId, data_collection_user: &str) -> Self {
        if user_id.as_str() == data_collection_user {
            AssessmentMode::DataCollection
        } else {
            AssessmentMode::Standard
        }
    }

    pub fn is_data_collection(&self) -> bool {
        matches!(self, AssessmentMode::DataCollection)
    }

    /// Completion is gated on answered questions only in standard mode.
    pub fn requires_full_answers(&self) -> bool {
        matches!(self, AssessmentMode::Standard)
    }
}

/// Rejects negative question numbers; numbers past the end only warn.
pub fn validate_question_number(
    question_number: i64,
    scheduler: &PhaseScheduler,
) -> Result<u32, ValidationError> {
    if question_number < 0 {
        return Err(ValidationError::invalid_format(
            "question_number",
            format!("Question number cannot be negative: {}", question_number),
        ));
    }
    let total = scheduler.total_questions();
    if question_number > i64::from(total) {
        tracing::warn!(
            question_number,
            total_questions = total,
            "Question number exceeds total questions"
        );
    }
    Ok(question_number.min(i64::from(u32::MAX)) as u32)
}

/// Set-oriented progress of a data-collection session.
///
/// `overall_question_number` is the 1-based number of the question on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCollectionProgress {
    pub current_set: u32,
    pub total_sets: u32,
    pub question_in_set: u32,
    pub questions_per_set: u32,
    pub overall_question_number: u32,
    pub total_questions: u32,
    pub element_id: ElementId,
    pub element_name: String,
    pub is_set_complete: bool,
    pub is_element_switching: bool,
    pub is_complete: bool,
    pub progress_percentage: f64,
}

impl DataCollectionProgress {
    pub fn new(
        question_number: u32,
        scheduler: &PhaseScheduler,
        element_id: ElementId,
        element_name: impl Into<String>,
    ) -> Self {
        let per_set = scheduler.questions_per_phase();
        let total = scheduler.total_questions();
        let (current_set, question_in_set) = match question_number {
            0 => (1, 1),
            n => ((n - 1) / per_set + 1, (n - 1) % per_set + 1),
        };
        let is_set_complete = question_number > 0 && question_number % per_set == 0;
        let percentage = if total == 0 {
            100.0
        } else {
            (f64::from(question_number) / f64::from(total) * 100.0).min(100.0)
        };

        Self {
            current_set,
            total_sets: scheduler.phase_count(),
            question_in_set,
            questions_per_set: per_set,
            overall_question_number: question_number,
            total_questions: total,
            element_id,
            element_name: element_name.into(),
            is_set_complete,
            is_element_switching: is_set_complete,
            is_complete: question_number >= total,
            progress_percentage: percentage,
        }
    }
}
