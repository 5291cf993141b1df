//! Session repository port.
//!
//! Defines the contract for creating, listing and closing assessment sessions.
//!
//! # Design
//!
//! - **User-scoped**: lookups go through the owning user id
//! - **Newest first**: listings are ordered by `started_at` descending, so the
//!   first in-progress entry is the session to resume

use crate::domain::foundation::{DomainError, SessionId, SessionStatus, UserId};
use crate::domain::session::Session;
use async_trait::async_trait;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Starts a new in-progress session for the user.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create_session(&self, user_id: &UserId) -> Result<SessionId, DomainError>;

    /// Lists the user's session ids, newest first, optionally filtered by status.
    async fn get_sessions_by_user(
        &self,
        user_id: &UserId,
        status: Option<SessionStatus>,
    ) -> Result<Vec<SessionId>, DomainError>;

    /// Find a session by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_session(&self, id: &SessionId) -> Result<Option<Session>, DomainError>;

    /// Marks the session completed.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if session doesn't exist
    /// - `InvalidStateTransition` if already completed
    async fn close_session(&self, id: &SessionId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SessionRepository) {}
    }
}
