//! In-memory session repository.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, SessionStatus, UserId};
use crate::domain::session::Session;
use crate::ports::SessionRepository;

/// Sessions kept in creation order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<Vec<Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create_session(&self, user_id: &UserId) -> Result<SessionId, DomainError> {
        let session = Session::start(user_id.clone());
        let id = *session.id();
        self.sessions.write().await.push(session);
        Ok(id)
    }

    async fn get_sessions_by_user(
        &self,
        user_id: &UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<SessionId>, DomainError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .rev()
            .filter(|s| s.is_owner(user_id))
            .filter(|s| status.map_or(true, |wanted| s.status() == wanted))
            .map(|s| *s.id())
            .collect())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().find(|s| s.id() == id).cloned())
    }

    async fn close_session(&self, id: &SessionId) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SessionNotFound, "Session not found")
                    .with_detail("session_id", id.to_string())
            })?;
        session.complete()
    }
}
