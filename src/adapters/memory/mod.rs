//! In-memory repository adapters for tests and single-process runs.

mod in_memory_question_repository;
mod in_memory_report_repository;
mod in_memory_session_repository;

pub use in_memory_question_repository::InMemoryQuestionRepository;
pub use in_memory_report_repository::InMemoryReportRepository;
pub use in_memory_session_repository::InMemorySessionRepository;
