//! Storage Adapters
//!
//! Implementations of the StateStorage port for conversation checkpoints.
//!
//! ## Available Adapters
//!
//! - **FileStateStorage** - One YAML file per session
//! - **InMemoryStateStorage** - Process memory (testing/development)
//!
//! The PostgreSQL store lives in `adapters::postgres`.
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileStateStorage, InMemoryStateStorage};
//!
//! let storage = FileStateStorage::new("./data/chat_states");
//! let storage = InMemoryStateStorage::new();
//! ```

mod file_state_storage;
mod in_memory_state_storage;

pub use file_state_storage::FileStateStorage;
pub use in_memory_state_storage::InMemoryStateStorage;
