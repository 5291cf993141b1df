//! In-memory question and answer repository.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::assessment::{AnswerRecord, NewQuestion, QuestionRecord};
use crate::domain::foundation::{
    AnswerId, DomainError, ErrorCode, QuestionId, SessionId, Timestamp,
};
use crate::ports::QuestionRepository;

#[derive(Debug, Default)]
struct Tables {
    questions: Vec<QuestionRecord>,
    answers: Vec<AnswerRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryQuestionRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn question_count(&self) -> usize {
        self.tables.read().await.questions.len()
    }

    pub async fn answer_count(&self) -> usize {
        self.tables.read().await.answers.len()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn save_question(&self, question: NewQuestion) -> Result<QuestionId, DomainError> {
        let mut tables = self.tables.write().await;

        let superseded: Vec<QuestionId> = tables
            .questions
            .iter()
            .filter(|q| {
                q.session_id == question.session_id && q.display_order == question.display_order
            })
            .map(|q| q.id)
            .collect();
        if !superseded.is_empty() {
            tracing::debug!(
                session_id = %question.session_id,
                display_order = question.display_order,
                "Superseding previously asked question"
            );
            tables.questions.retain(|q| !superseded.contains(&q.id));
            tables.answers.retain(|a| !superseded.contains(&a.question_id));
        }

        let id = QuestionId::new();
        tables.questions.push(QuestionRecord::from_new(id, question));
        Ok(id)
    }

    async fn save_answer(
        &self,
        question_id: &QuestionId,
        text: &str,
    ) -> Result<AnswerId, DomainError> {
        let mut tables = self.tables.write().await;

        if !tables.questions.iter().any(|q| &q.id == question_id) {
            return Err(
                DomainError::new(ErrorCode::QuestionNotFound, "Question not found")
                    .with_detail("question_id", question_id.to_string()),
            );
        }

        // one answer per question
        if let Some(existing) = tables
            .answers
            .iter_mut()
            .find(|a| &a.question_id == question_id)
        {
            existing.text = text.to_string();
            existing.timestamp = Timestamp::now();
            return Ok(existing.id);
        }

        let id = AnswerId::new();
        tables.answers.push(AnswerRecord {
            id,
            question_id: *question_id,
            text: text.to_string(),
            timestamp: Timestamp::now(),
        });
        Ok(id)
    }

    async fn find_questions_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, DomainError> {
        let tables = self.tables.read().await;
        let mut questions: Vec<QuestionRecord> = tables
            .questions
            .iter()
            .filter(|q| &q.session_id == session_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.display_order);
        Ok(questions)
    }

    async fn find_answer_by_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<Option<AnswerRecord>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .iter()
            .find(|a| &a.question_id == question_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::ElementId;

    fn question(session_id: SessionId, display_order: u32, text: &str) -> NewQuestion {
        NewQuestion {
            session_id,
            element_id: ElementId::FIRST,
            display_order,
            text: text.to_string(),
            model_version: "mock-model-1".to_string(),
        }
    }

    #[tokio::test]
    async fn questions_come_back_in_display_order() {
        let repo = InMemoryQuestionRepository::new();
        let session = SessionId::new();
        repo.save_question(question(session, 1, "second")).await.unwrap();
        repo.save_question(question(session, 0, "first")).await.unwrap();
        repo.save_question(question(SessionId::new(), 0, "other")).await.unwrap();

        let found = repo.find_questions_by_session(&session).await.unwrap();

        let texts: Vec<_> = found.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn saving_same_order_supersedes_question_and_answer() {
        let repo = InMemoryQuestionRepository::new();
        let session = SessionId::new();
        let old = repo.save_question(question(session, 0, "old")).await.unwrap();
        repo.save_answer(&old, "old answer").await.unwrap();

        let new = repo.save_question(question(session, 0, "new")).await.unwrap();

        let found = repo.find_questions_by_session(&session).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, new);
        assert!(repo.find_answer_by_question(&old).await.unwrap().is_none());
        assert_eq!(repo.answer_count().await, 0);
    }

    #[tokio::test]
    async fn reanswering_replaces_the_answer() {
        let repo = InMemoryQuestionRepository::new();
        let id = repo
            .save_question(question(SessionId::new(), 0, "q"))
            .await
            .unwrap();

        let first = repo.save_answer(&id, "first").await.unwrap();
        let second = repo.save_answer(&id, "second").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.answer_count().await, 1);
        let answer = repo.find_answer_by_question(&id).await.unwrap().unwrap();
        assert_eq!(answer.text, "second");
    }

    #[tokio::test]
    async fn answer_to_unknown_question_fails() {
        let repo = InMemoryQuestionRepository::new();
        let err = repo.save_answer(&QuestionId::new(), "x").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuestionNotFound);
    }
}
