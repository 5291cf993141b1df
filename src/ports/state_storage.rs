//! State Storage Port - Interface for persisting conversation checkpoints.
//!
//! One `ChatState` per session. Writes are guarded by the state's `revision`:
//! a store only accepts an update whose revision matches what it holds, so two
//! concurrent rounds on one session cannot silently overwrite each other.

use async_trait::async_trait;

use crate::domain::assessment::ChatState;
use crate::domain::foundation::SessionId;

/// Errors that can occur during state storage operations
#[derive(Debug, thiserror::Error)]
pub enum StateStorageError {
    #[error("Failed to serialize state: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize state: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("State for session {session_id} changed concurrently (expected revision {expected}, found {found})")]
    Conflict {
        session_id: SessionId,
        expected: u64,
        found: u64,
    },
}

/// Port for persisting and loading conversation state
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Loads the checkpoint, `None` when the session has none yet.
    async fn get_state(&self, session_id: &SessionId)
        -> Result<Option<ChatState>, StateStorageError>;

    /// Stores `state` if its revision matches the stored one (0 when absent).
    ///
    /// # Returns
    /// The new revision the caller must carry into its next update.
    ///
    /// # Errors
    /// `Conflict` when the stored revision differs.
    async fn update_state(
        &self,
        session_id: &SessionId,
        state: &ChatState,
    ) -> Result<u64, StateStorageError>;

    async fn delete_state(&self, session_id: &SessionId) -> Result<(), StateStorageError>;
}
