//! Assessment module - the rules of a phased personality assessment.
//!
//! Pure types and functions: element catalogue, phase scheduling, the
//! per-phase context window, the conversation checkpoint and mode policies.
//! Nothing in here performs I/O.

mod chat_state;
mod context_window;
mod element;
mod mode;
mod records;
mod scheduler;

pub use chat_state::{ChatMessage, ChatState, ConversationPhase, MessageRole, UndoOutcome};
pub use context_window::filter_by_phase;
pub use element::{ElementId, PersonalityElement, BUILTIN_ELEMENTS, DEFAULT_ELEMENT_COUNT};
pub use mode::{validate_question_number, AssessmentMode, DataCollectionProgress};
pub use records::{
    AnswerRecord, DiagnosisReport, NewQuestion, QuestionRecord, CANNED_MODEL_VERSION,
};
pub use scheduler::{
    PhaseScheduler, PhaseSlot, DATA_COLLECTION_QUESTIONS_PER_SET, DATA_COLLECTION_TOTAL_SETS,
};
