//! Session domain module.
//!
//! Lifecycle of assessment sessions: started in progress, completed once.

mod aggregate;

pub use aggregate::Session;
