//! PostgreSQL implementation of QuestionRepository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::assessment::{AnswerRecord, ElementId, NewQuestion, QuestionRecord};
use crate::domain::foundation::{
    AnswerId, DomainError, ErrorCode, QuestionId, SessionId, Timestamp,
};
use crate::ports::QuestionRepository;

#[derive(Clone)]
pub struct PostgresQuestionRepository {
    pool: PgPool,
}

impl PostgresQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionRepository for PostgresQuestionRepository {
    async fn save_question(&self, question: NewQuestion) -> Result<QuestionId, DomainError> {
        let id = QuestionId::new();
        let record = QuestionRecord::from_new(id, question);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        // answers of a superseded question go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM generated_questions WHERE session_id = $1 AND display_order = $2")
            .bind(record.session_id.as_uuid())
            .bind(record.display_order as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to supersede question: {}", e))
            })?;

        sqlx::query(
            r#"
            INSERT INTO generated_questions (
                id, session_id, element_id, display_order, question_text, model_version, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.session_id.as_uuid())
        .bind(record.element_id.value() as i32)
        .bind(record.display_order as i32)
        .bind(&record.text)
        .bind(&record.model_version)
        .bind(record.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert question: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit question: {}", e)))?;

        Ok(id)
    }

    /// Upserts on `question_id`; re-answering replaces the stored answer.
    async fn save_answer(
        &self,
        question_id: &QuestionId,
        text: &str,
    ) -> Result<AnswerId, DomainError> {
        let row: Option<(uuid::Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO user_answers (id, question_id, answer_text, answered_at)
            SELECT $1, q.id, $3, $4 FROM generated_questions q WHERE q.id = $2
            ON CONFLICT (question_id) DO UPDATE
                SET answer_text = EXCLUDED.answer_text,
                    answered_at = EXCLUDED.answered_at
            RETURNING id
            "#,
        )
        .bind(AnswerId::new().as_uuid())
        .bind(question_id.as_uuid())
        .bind(text)
        .bind(Timestamp::now().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save answer: {}", e)))?;

        match row {
            Some((id,)) => Ok(AnswerId::from_uuid(id)),
            None => Err(
                DomainError::new(ErrorCode::QuestionNotFound, "Question not found")
                    .with_detail("question_id", question_id.to_string()),
            ),
        }
    }

    async fn find_questions_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<QuestionRecord>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, element_id, display_order, question_text, model_version, created_at
            FROM generated_questions
            WHERE session_id = $1
            ORDER BY display_order
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch questions: {}", e)))?;

        rows.into_iter().map(row_to_question).collect()
    }

    async fn find_answer_by_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<Option<AnswerRecord>, DomainError> {
        let row: Option<(uuid::Uuid, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            r#"
            SELECT id, answer_text, answered_at
            FROM user_answers
            WHERE question_id = $1
            ORDER BY answered_at DESC
            LIMIT 1
            "#,
        )
        .bind(question_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch answer: {}", e)))?;

        Ok(row.map(|(id, text, answered_at)| AnswerRecord {
            id: AnswerId::from_uuid(id),
            question_id: *question_id,
            text,
            timestamp: Timestamp::from_datetime(answered_at),
        }))
    }
}

fn row_to_question(row: sqlx::postgres::PgRow) -> Result<QuestionRecord, DomainError> {
    let column = |name: &str, e: sqlx::Error| {
        DomainError::database(format!("Failed to get {}: {}", name, e))
    };

    let id: uuid::Uuid = row.try_get("id").map_err(|e| column("id", e))?;
    let session_id: uuid::Uuid = row.try_get("session_id").map_err(|e| column("session_id", e))?;
    let element_id: i32 = row.try_get("element_id").map_err(|e| column("element_id", e))?;
    let display_order: i32 = row
        .try_get("display_order")
        .map_err(|e| column("display_order", e))?;
    let text: String = row
        .try_get("question_text")
        .map_err(|e| column("question_text", e))?;
    let model_version: String = row
        .try_get("model_version")
        .map_err(|e| column("model_version", e))?;
    let created_at: chrono::DateTime<chrono::Utc> =
        row.try_get("created_at").map_err(|e| column("created_at", e))?;

    let element_id = ElementId::new(element_id.max(0) as u32)
        .map_err(|e| DomainError::database(format!("Invalid element_id: {}", e)))?;

    Ok(QuestionRecord {
        id: QuestionId::from_uuid(id),
        session_id: SessionId::from_uuid(session_id),
        element_id,
        display_order: display_order.max(0) as u32,
        text,
        model_version,
        created_at: Timestamp::from_datetime(created_at),
    })
}
