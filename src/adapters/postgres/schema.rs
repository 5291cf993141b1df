//! Table definitions and start-up migration.

use sqlx::PgPool;

use crate::domain::foundation::DomainError;

/// Idempotent DDL, applied in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        external_id TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_login TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chat_sessions (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed')),
        started_at TIMESTAMPTZ NOT NULL,
        finished_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_status
        ON chat_sessions (user_id, status, started_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS generated_questions (
        id UUID PRIMARY KEY,
        session_id UUID NOT NULL REFERENCES chat_sessions(id),
        element_id INTEGER NOT NULL,
        display_order INTEGER NOT NULL,
        question_text TEXT NOT NULL,
        model_version TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (session_id, display_order)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_answers (
        id UUID PRIMARY KEY,
        question_id UUID NOT NULL REFERENCES generated_questions(id) ON DELETE CASCADE,
        answer_text TEXT NOT NULL,
        answered_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_user_answers_question
        ON user_answers (question_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS diagnosis_reports (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        element_id INTEGER NOT NULL,
        report TEXT NOT NULL,
        predicted_label TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chat_states (
        session_id UUID PRIMARY KEY,
        state JSONB NOT NULL,
        revision BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

pub async fn migrate(pool: &PgPool) -> Result<(), DomainError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))?;
    }
    tracing::info!(statements = SCHEMA_STATEMENTS.len(), "Database schema ensured");
    Ok(())
}

/// Looks up a user's internal id by external id, creating the row if needed.
pub(crate) async fn get_or_create_user(
    pool: &PgPool,
    external_id: &str,
) -> Result<uuid::Uuid, DomainError> {
    let (id,): (uuid::Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, external_id)
        VALUES ($1, $2)
        ON CONFLICT (external_id) DO UPDATE SET last_login = now()
        RETURNING id
        "#,
    )
    .bind(uuid::Uuid::new_v4())
    .bind(external_id)
    .fetch_one(pool)
    .await
    .map_err(|e| DomainError::database(format!("Failed to resolve user: {}", e)))?;

    Ok(id)
}
