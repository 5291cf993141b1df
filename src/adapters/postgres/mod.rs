//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSessionRepository` - `chat_sessions`, users resolved by external id
//! - `PostgresQuestionRepository` - `generated_questions` and `user_answers`
//! - `PostgresReportRepository` - `diagnosis_reports`
//! - `PostgresStateStorage` - JSONB checkpoints with revision check
//! - `schema::migrate` - idempotent table creation

mod question_repository;
mod report_repository;
pub mod schema;
mod session_repository;
mod state_storage;

pub use question_repository::PostgresQuestionRepository;
pub use report_repository::PostgresReportRepository;
pub use schema::migrate;
pub use session_repository::PostgresSessionRepository;
pub use state_storage::PostgresStateStorage;
