//! PostgreSQL implementation of SessionRepository.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::schema::get_or_create_user;
use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionStatus, Timestamp, UserId,
};
use crate::domain::session::Session;
use crate::ports::SessionRepository;

#[derive(Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create_session(&self, user_id: &UserId) -> Result<SessionId, DomainError> {
        let user_uuid = get_or_create_user(&self.pool, user_id.as_str()).await?;
        let session = Session::start(user_id.clone());

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, user_id, status, started_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(user_uuid)
        .bind(session.status().as_str())
        .bind(session.started_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert session: {}", e)))?;

        Ok(*session.id())
    }

    async fn get_sessions_by_user(
        &self,
        user_id: &UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<SessionId>, DomainError> {
        let rows: Vec<(uuid::Uuid,)> = sqlx::query_as(
            r#"
            SELECT s.id
            FROM chat_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE u.external_id = $1
              AND ($2::TEXT IS NULL OR s.status = $2)
            ORDER BY s.started_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch sessions by user: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(id,)| SessionId::from_uuid(id))
            .collect())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT s.id, u.external_id, s.status, s.started_at, s.finished_at
            FROM chat_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch session: {}", e)))?;

        row.map(row_to_session).transpose()
    }

    async fn close_session(&self, id: &SessionId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_sessions SET status = 'completed', finished_at = now()
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to close session: {}", e)))?;

        if result.rows_affected() == 0 {
            return match self.find_session(id).await? {
                Some(_) => Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    "Session is already completed",
                )
                .with_detail("session_id", id.to_string())),
                None => Err(DomainError::new(
                    ErrorCode::SessionNotFound,
                    format!("Session not found: {}", id),
                )),
            };
        }

        Ok(())
    }
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<Session, DomainError> {
    let column = |name: &str, e: sqlx::Error| {
        DomainError::database(format!("Failed to get {}: {}", name, e))
    };

    let id: uuid::Uuid = row.try_get("id").map_err(|e| column("id", e))?;
    let external_id: String = row.try_get("external_id").map_err(|e| column("external_id", e))?;
    let status: String = row.try_get("status").map_err(|e| column("status", e))?;
    let started_at: chrono::DateTime<chrono::Utc> =
        row.try_get("started_at").map_err(|e| column("started_at", e))?;
    let finished_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("finished_at").map_err(|e| column("finished_at", e))?;

    let status: SessionStatus = status
        .parse()
        .map_err(|e| DomainError::database(format!("Invalid session status: {}", e)))?;
    let user_id = UserId::new(external_id)
        .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?;

    Ok(Session::reconstitute(
        SessionId::from_uuid(id),
        user_id,
        status,
        Timestamp::from_datetime(started_at),
        finished_at.map(Timestamp::from_datetime),
    ))
}
