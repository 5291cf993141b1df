//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Generation Ports
//!
//! - `GenerationPort` - Question and answer-option generation, tagged failures
//! - `AIProvider` - Raw chat completion against an LLM backend
//!
//! ## Persistence Ports
//!
//! - `SessionRepository` - Session lifecycle
//! - `QuestionRepository` - Asked questions and their answers
//! - `ElementRepository` - Personality element catalogue
//! - `ReportRepository` - Saved diagnosis reports
//! - `StateStorage` - Per-session conversation checkpoint

mod ai_provider;
mod element_repository;
mod generation;
mod question_repository;
mod report_repository;
mod session_repository;
mod state_storage;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    MessageRole, ProviderInfo, TokenUsage,
};
pub use element_repository::{ElementInfo, ElementRepository};
pub use generation::{GenerationError, GenerationPort, QuestionContext};
pub use question_repository::QuestionRepository;
pub use report_repository::ReportRepository;
pub use session_repository::SessionRepository;
pub use state_storage::{StateStorage, StateStorageError};
