//! Conversation engine.
//!
//! - `ConversationService` - every user-facing operation
//! - `QuestionGenerator` - canned or generated next question, persisted
//! - `OptionGenerator` - sequential candidate answers
//! - `ConversationError` - public error taxonomy and its boundary projection

mod errors;
mod option_generator;
mod question_generator;
mod results;
mod service;

pub use errors::{ConversationError, ErrorResponse};
pub use option_generator::{strip_role_prefix, OptionGenerator, DEFAULT_OPTION_COUNT};
pub use question_generator::{QuestionDraft, QuestionGenerator};
pub use results::{
    ArchivedConversation, CompletionSummary, ConversationTurn, DiagnosisTurn, Progress,
    ProgressReport, QuestionTurn, SavedReport, SessionView, UndoSummary,
};
pub use service::{
    ConversationPorts, ConversationService, ConversationSettings, MIN_ARCHIVED_QUESTIONS,
};
