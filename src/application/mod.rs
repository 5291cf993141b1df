//! Application layer - orchestration over the ports.
//!
//! The conversation service drives rounds; the retry policy wraps every
//! generation call it makes.

pub mod conversation;
pub mod retry;

pub use conversation::{
    ConversationError, ConversationPorts, ConversationService, ConversationSettings,
    ConversationTurn,
};
pub use retry::{Classify, FailureKind, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
