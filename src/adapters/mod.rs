//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Generation providers, the prompted generator and the provider registry
//! - `elements` - Element catalogue (built-in or YAML)
//! - `memory` - In-memory session, question and report repositories
//! - `postgres` - PostgreSQL repositories and state store
//! - `storage` - File and in-memory state stores

pub mod ai;
pub mod elements;
pub mod memory;
pub mod postgres;
pub mod storage;
