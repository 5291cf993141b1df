//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port plus the generation adapter built on
//! top of it.
//!
//! ## Available Adapters
//!
//! - `GeminiProvider` - Google Generative Language API
//! - `OpenAiCompatibleProvider` - OpenAI chat completions and compatible local servers
//! - `MockAIProvider` - Configurable mock for testing and offline runs
//! - `ProviderRegistry` - Lazily built providers shared per model name
//! - `PromptedGenerator` - GenerationPort implementation over any provider

mod gemini_provider;
mod mock_provider;
mod openai_compatible_provider;
mod prompted_generator;
pub mod prompts;
mod registry;

pub use gemini_provider::{GeminiConfig, GeminiProvider, DEFAULT_GEMINI_BASE_URL};
pub use mock_provider::{MockAIProvider, MockError, MockResponse};
pub use openai_compatible_provider::{
    OpenAiCompatibleConfig, OpenAiCompatibleProvider, DEFAULT_OPENAI_BASE_URL,
};
pub use prompted_generator::{classify, PromptedGenerator};
pub use registry::ProviderRegistry;
