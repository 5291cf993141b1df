//! In-Memory State Storage Adapter
//!
//! Keeps one checkpoint per session in a map. Useful for tests and
//! single-process development runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::assessment::ChatState;
use crate::domain::foundation::SessionId;
use crate::ports::{StateStorage, StateStorageError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStorage {
    states: Arc<RwLock<HashMap<SessionId, ChatState>>>,
}

impl InMemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.states.write().await.clear();
    }

    pub async fn state_count(&self) -> usize {
        self.states.read().await.len()
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ChatState>, StateStorageError> {
        Ok(self.states.read().await.get(session_id).cloned())
    }

    async fn update_state(
        &self,
        session_id: &SessionId,
        state: &ChatState,
    ) -> Result<u64, StateStorageError> {
        let mut states = self.states.write().await;

        let found = states.get(session_id).map(|s| s.revision).unwrap_or(0);
        if found != state.revision {
            return Err(StateStorageError::Conflict {
                session_id: *session_id,
                expected: state.revision,
                found,
            });
        }

        let mut stored = state.clone();
        stored.revision = found + 1;
        states.insert(*session_id, stored);
        Ok(found + 1)
    }

    async fn delete_state(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
        self.states.write().await.remove(session_id);
        Ok(())
    }
}
