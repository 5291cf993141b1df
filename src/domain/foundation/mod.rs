//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, session status, and the error vocabulary
//! used by every other layer.

mod errors;
mod ids;
mod session_status;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AnswerId, QuestionId, ReportId, SessionId, UserId};
pub use session_status::SessionStatus;
pub use timestamp::Timestamp;
