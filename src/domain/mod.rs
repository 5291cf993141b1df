//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, status, errors)
//! - `assessment` - Elements, phase scheduling, context windowing, chat state
//! - `session` - Assessment session lifecycle

pub mod assessment;
pub mod foundation;
pub mod session;
