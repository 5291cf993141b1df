//! Session aggregate entity.
//!
//! A session is one attempt at an assessment by one user. It is either in
//! progress or completed; completion freezes the session's conversation state.

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionId, SessionStatus, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// Session aggregate.
///
/// # Invariants
///
/// - `finished_at` is set iff `status` is `Completed`
/// - Completed sessions cannot be completed again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    status: SessionStatus,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl Session {
    /// Starts a new in-progress session.
    pub fn start(user_id: UserId) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            status: SessionStatus::InProgress,
            started_at: Timestamp::now(),
            finished_at: None,
        }
    }

    /// Reconstitute a session from persistence (no validation).
    pub fn reconstitute(
        id: SessionId,
        user_id: UserId,
        status: SessionStatus,
        started_at: Timestamp,
        finished_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            started_at,
            finished_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn finished_at(&self) -> Option<&Timestamp> {
        self.finished_at.as_ref()
    }

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if already completed
    pub fn complete(&mut self) -> Result<(), DomainError> {
        if !self.status.can_transition_to(&SessionStatus::Completed) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Session is already completed",
            )
            .with_detail("session_id", self.id.to_string()));
        }

        self.status = SessionStatus::Completed;
        self.finished_at = Some(Timestamp::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn start_creates_in_progress_session() {
        let session = Session::start(user());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.finished_at().is_none());
        assert!(session.is_owner(&user()));
    }

    #[test]
    fn complete_sets_finished_at() {
        let mut session = Session::start(user());
        session.complete().unwrap();

        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(session.finished_at().is_some());
    }

    #[test]
    fn complete_twice_fails() {
        let mut session = Session::start(user());
        session.complete().unwrap();

        let err = session.complete().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }
}
