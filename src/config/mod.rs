//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `DIAGNOSIS_CHAT` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment yields a runnable
//! in-memory setup once an AI key (or the mock provider) is configured.
//!
//! # Example
//!
//! ```no_run
//! use diagnosis_chat::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod assessment;
mod error;
mod log;
mod retry;
mod storage;

pub use ai::{AiConfig, AiProviderKind};
pub use assessment::AssessmentConfig;
pub use error::{ConfigError, ValidationError};
pub use log::LogConfig;
pub use retry::RetryConfig;
pub use storage::{DatabaseConfig, StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub assessment: AssessmentConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DIAGNOSIS_CHAT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `DIAGNOSIS_CHAT__AI__PROVIDER=gemini` -> `ai.provider = gemini`
    /// - `DIAGNOSIS_CHAT__STORAGE__DATABASE__URL=...` -> `storage.database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DIAGNOSIS_CHAT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.assessment.validate()?;
        self.ai.validate()?;
        self.retry.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
