//! PostgreSQL State Storage Adapter
//!
//! Checkpoints live in `chat_states` as JSONB with the revision in its own
//! column; the revision check happens in the `WHERE` clause of the write.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::assessment::ChatState;
use crate::domain::foundation::SessionId;
use crate::ports::{StateStorage, StateStorageError};

#[derive(Clone)]
pub struct PostgresStateStorage {
    pool: PgPool,
}

impl PostgresStateStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn stored_revision(&self, session_id: &SessionId) -> Result<u64, StateStorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT revision FROM chat_states WHERE session_id = $1")
                .bind(session_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StateStorageError::DatabaseError(e.to_string()))?;
        Ok(row.map(|(r,)| r.max(0) as u64).unwrap_or(0))
    }
}

#[async_trait]
impl StateStorage for PostgresStateStorage {
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ChatState>, StateStorageError> {
        let row: Option<(serde_json::Value, i64)> =
            sqlx::query_as("SELECT state, revision FROM chat_states WHERE session_id = $1")
                .bind(session_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StateStorageError::DatabaseError(e.to_string()))?;

        row.map(|(value, revision)| {
            let mut state: ChatState = serde_json::from_value(value)
                .map_err(|e| StateStorageError::DeserializationFailed(e.to_string()))?;
            state.revision = revision.max(0) as u64;
            Ok(state)
        })
        .transpose()
    }

    async fn update_state(
        &self,
        session_id: &SessionId,
        state: &ChatState,
    ) -> Result<u64, StateStorageError> {
        let next = state.revision + 1;
        let mut stored = state.clone();
        stored.revision = next;
        let payload = Json(&stored);

        let result = if state.revision == 0 {
            sqlx::query(
                r#"
                INSERT INTO chat_states (session_id, state, revision, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (session_id) DO NOTHING
                "#,
            )
            .bind(session_id.as_uuid())
            .bind(payload)
            .bind(next as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StateStorageError::DatabaseError(e.to_string()))?
        } else {
            sqlx::query(
                r#"
                UPDATE chat_states SET state = $2, revision = $3, updated_at = now()
                WHERE session_id = $1 AND revision = $4
                "#,
            )
            .bind(session_id.as_uuid())
            .bind(payload)
            .bind(next as i64)
            .bind(state.revision as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StateStorageError::DatabaseError(e.to_string()))?
        };

        if result.rows_affected() == 0 {
            let found = self.stored_revision(session_id).await?;
            return Err(StateStorageError::Conflict {
                session_id: *session_id,
                expected: state.revision,
                found,
            });
        }

        Ok(next)
    }

    async fn delete_state(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
        sqlx::query("DELETE FROM chat_states WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StateStorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
