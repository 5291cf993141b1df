//! Storage backend configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Where sessions, questions and chat state are kept
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the file state store
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Everything in process memory
    #[default]
    Memory,
    /// Chat state as YAML files, records in memory
    File,
    /// Everything in PostgreSQL
    Postgres,
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Create tables on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__DATABASE__URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl StorageConfig {
    /// The database section is only checked for the postgres backend.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.backend {
            StorageBackend::Postgres => self.database.validate(),
            StorageBackend::File if self.state_dir.as_os_str().is_empty() => {
                Err(ValidationError::MissingRequired("STORAGE__STATE_DIR"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            state_dir: default_state_dir(),
            database: DatabaseConfig::default(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("data/chat_states")
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_run_migrations() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_is_default_and_valid() {
        let config = StorageConfig::default();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_requires_url() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("STORAGE__DATABASE__URL"))
        );
    }

    #[test]
    fn test_postgres_url_scheme_checked() {
        let mut config = StorageConfig {
            backend: StorageBackend::Postgres,
            ..Default::default()
        };
        config.database.url = "mysql://localhost/db".to_string();
        assert_eq!(config.validate(), Err(ValidationError::InvalidDatabaseUrl));

        config.database.url = "postgres://localhost/diagnosis".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pool_bounds_checked() {
        let config = DatabaseConfig {
            url: "postgres://localhost/db".to_string(),
            min_connections: 20,
            max_connections: 5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPoolSize));
    }
}
