//! Question repository port.
//!
//! Persists asked questions and the answers given to them. Display orders are
//! unique per session: saving a question for an order that already exists
//! (after an undo) supersedes the earlier question and its answer.

use crate::domain::assessment::{AnswerRecord, NewQuestion, QuestionRecord};
use crate::domain::foundation::{AnswerId, DomainError, QuestionId, SessionId};
use async_trait::async_trait;

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persists a question and returns its repository-assigned id.
    async fn save_question(&self, question: NewQuestion) -> Result<QuestionId, DomainError>;

    /// Records an answer.
    ///
    /// # Errors
    ///
    /// - `QuestionNotFound` if the question doesn't exist
    async fn save_answer(&self, question_id: &QuestionId, text: &str)
        -> Result<AnswerId, DomainError>;

    /// All questions of a session ordered by display order.
    async fn find_questions_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, DomainError>;

    /// Latest answer to a question, if any.
    async fn find_answer_by_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<Option<AnswerRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn QuestionRepository) {}
    }
}
