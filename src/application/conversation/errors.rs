//! Errors surfaced by the conversation service.

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};
use crate::ports::{GenerationError, StateStorageError};

/// Failures of a conversation operation.
///
/// Every variant except `Unexpected` is part of the public taxonomy and reaches
/// callers unchanged. `Unexpected` never leaves the service: operations seal it
/// into `Assessment` with the original message and type in the details.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversationError {
    #[error("No active session found for user {user_id}")]
    SessionNotFound { user_id: String },

    #[error("{message}")]
    InvalidResponse {
        message: String,
        details: HashMap<String, String>,
    },

    #[error("Assessment incomplete: {answered} of {required} questions answered")]
    AssessmentIncomplete { answered: u32, required: u32 },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("{message}")]
    Assessment {
        message: String,
        details: HashMap<String, String>,
    },

    #[error("{error_type}: {message}")]
    Unexpected {
        error_type: &'static str,
        message: String,
    },
}

impl ConversationError {
    pub fn session_not_found(user_id: &UserId) -> Self {
        Self::SessionNotFound {
            user_id: user_id.to_string(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Adds a detail to `InvalidResponse` or `Assessment`; no-op otherwise.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        if let Self::InvalidResponse { details, .. } | Self::Assessment { details, .. } = &mut self
        {
            details.insert(key.into(), value.to_string());
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            Self::InvalidResponse { .. } => ErrorCode::InvalidResponse,
            Self::AssessmentIncomplete { .. } => ErrorCode::AssessmentIncomplete,
            Self::Generation(_) => ErrorCode::GenerationFailed,
            Self::Storage(_) => ErrorCode::DatabaseError,
            Self::Assessment { .. } | Self::Unexpected { .. } => ErrorCode::InternalError,
        }
    }

    pub fn details(&self) -> HashMap<String, String> {
        match self {
            Self::SessionNotFound { user_id } => {
                HashMap::from([("user_id".to_string(), user_id.clone())])
            }
            Self::InvalidResponse { details, .. } | Self::Assessment { details, .. } => {
                details.clone()
            }
            Self::AssessmentIncomplete { answered, required } => HashMap::from([
                ("answered".to_string(), answered.to_string()),
                ("required".to_string(), required.to_string()),
            ]),
            Self::Generation(err) => HashMap::from([("kind".to_string(), err.kind().to_string())]),
            Self::Storage(_) => HashMap::new(),
            Self::Unexpected { error_type, .. } => {
                HashMap::from([("error_type".to_string(), error_type.to_string())])
            }
        }
    }

    /// Wraps anything outside the taxonomy into `Assessment`.
    pub fn seal(self, operation: &str, user_id: &UserId) -> Self {
        match self {
            Self::Unexpected {
                error_type,
                message,
            } => {
                tracing::error!(
                    user_id = %user_id,
                    operation,
                    error_type,
                    error = %message,
                    "Unexpected failure"
                );
                Self::Assessment {
                    message: format!("Failed to {} due to unexpected error", operation),
                    details: HashMap::from([
                        ("user_id".to_string(), user_id.to_string()),
                        ("error".to_string(), message),
                        ("error_type".to_string(), error_type.to_string()),
                    ]),
                }
            }
            known => known,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status: "error",
            message: self.to_string(),
            error_type: self.code().to_string(),
            details: self.details(),
        }
    }
}

impl From<DomainError> for ConversationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::DatabaseError => Self::Storage(err.message),
            _ => Self::Unexpected {
                error_type: "DomainError",
                message: err.to_string(),
            },
        }
    }
}

impl From<ValidationError> for ConversationError {
    fn from(err: ValidationError) -> Self {
        Self::Unexpected {
            error_type: "ValidationError",
            message: err.to_string(),
        }
    }
}

impl From<StateStorageError> for ConversationError {
    fn from(err: StateStorageError) -> Self {
        match err {
            StateStorageError::SerializationFailed(_)
            | StateStorageError::DeserializationFailed(_) => Self::Unexpected {
                error_type: "StateStorageError",
                message: err.to_string(),
            },
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Boundary projection of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub error_type: String,
    pub details: HashMap<String, String>,
}
