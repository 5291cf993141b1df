//! Service container - builds the conversation service from configuration.
//!
//! Picks the storage backend, loads the element catalogue, and resolves the
//! generation provider through a registry keyed by model name.

use std::sync::Arc;

use secrecy::Secret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::adapters::ai::{
    GeminiConfig, GeminiProvider, MockAIProvider, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider, PromptedGenerator, ProviderRegistry,
};
use crate::adapters::elements::CatalogElementRepository;
use crate::adapters::memory::{
    InMemoryQuestionRepository, InMemoryReportRepository, InMemorySessionRepository,
};
use crate::adapters::postgres::{
    migrate, PostgresQuestionRepository, PostgresReportRepository, PostgresSessionRepository,
    PostgresStateStorage,
};
use crate::adapters::storage::{FileStateStorage, InMemoryStateStorage};
use crate::application::retry::RetryPolicy;
use crate::application::{ConversationPorts, ConversationService, ConversationSettings};
use crate::config::{
    AiConfig, AiProviderKind, AppConfig, DatabaseConfig, StorageBackend, ValidationError,
};
use crate::domain::foundation::DomainError;
use crate::ports::{
    AIError, AIProvider, QuestionRepository, ReportRepository, SessionRepository, StateStorage,
};

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to initialise AI provider: {0}")]
    Provider(#[from] AIError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Setup(#[from] DomainError),
}

/// Record stores for one backend.
struct Stores {
    sessions: Arc<dyn SessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    reports: Arc<dyn ReportRepository>,
    states: Arc<dyn StateStorage>,
}

impl Stores {
    fn in_memory(states: Arc<dyn StateStorage>) -> Self {
        Self {
            sessions: Arc::new(InMemorySessionRepository::new()),
            questions: Arc::new(InMemoryQuestionRepository::new()),
            reports: Arc::new(InMemoryReportRepository::new()),
            states,
        }
    }

    fn postgres(pool: PgPool) -> Self {
        Self {
            sessions: Arc::new(PostgresSessionRepository::new(pool.clone())),
            questions: Arc::new(PostgresQuestionRepository::new(pool.clone())),
            reports: Arc::new(PostgresReportRepository::new(pool.clone())),
            states: Arc::new(PostgresStateStorage::new(pool)),
        }
    }
}

pub struct ServiceContainer {
    config: AppConfig,
    registry: Arc<ProviderRegistry>,
    service: Arc<ConversationService>,
}

impl ServiceContainer {
    /// Validates `config` and wires every adapter it selects.
    pub async fn from_config(config: &AppConfig) -> Result<Self, ContainerError> {
        config.validate()?;

        let registry = Arc::new(ProviderRegistry::new(provider_factory(config.ai.clone())));
        let provider = registry.get_or_init(&config.ai.model)?;
        let generator = PromptedGenerator::new(provider)
            .with_temperature(config.ai.temperature)
            .with_max_tokens(config.ai.max_tokens);

        let assessment = &config.assessment;
        let elements = match &assessment.elements_file {
            Some(path) => {
                CatalogElementRepository::from_yaml_file(path, assessment.questions_per_phase)
                    .await?
            }
            None => CatalogElementRepository::builtin(assessment.questions_per_phase),
        };
        if elements.element_count() != assessment.element_count {
            tracing::warn!(
                configured = assessment.element_count,
                catalogue = elements.element_count(),
                "Element count differs from catalogue, using catalogue"
            );
        }
        let settings = ConversationSettings::from_config(assessment)
            .with_element_count(elements.element_count());

        let stores = match config.storage.backend {
            StorageBackend::Memory => Stores::in_memory(Arc::new(InMemoryStateStorage::new())),
            StorageBackend::File => Stores::in_memory(Arc::new(FileStateStorage::new(
                &config.storage.state_dir,
            ))),
            StorageBackend::Postgres => {
                let pool = connect(&config.storage.database).await?;
                if config.storage.database.run_migrations {
                    migrate(&pool).await?;
                }
                Stores::postgres(pool)
            }
        };
        tracing::info!(
            backend = ?config.storage.backend,
            provider = ?config.ai.provider,
            model = %config.ai.model,
            "Service container ready"
        );

        let ports = ConversationPorts {
            generator: Arc::new(generator),
            sessions: stores.sessions,
            questions: stores.questions,
            elements: Arc::new(elements),
            reports: stores.reports,
            states: stores.states,
        };
        let service = ConversationService::new(
            ports,
            settings,
            RetryPolicy::from_config(&config.retry),
        );

        Ok(Self {
            config: config.clone(),
            registry,
            service: Arc::new(service),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn service(&self) -> Arc<ConversationService> {
        Arc::clone(&self.service)
    }
}

async fn connect(database: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await?;
    tracing::info!(max_connections = database.max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Builds providers of the configured kind for any model name.
fn provider_factory(
    ai: AiConfig,
) -> impl Fn(&str) -> Result<Arc<dyn AIProvider>, AIError> + Send + Sync + 'static {
    move |model: &str| -> Result<Arc<dyn AIProvider>, AIError> {
        match ai.provider {
            AiProviderKind::Gemini => {
                let key = ai
                    .api_key
                    .clone()
                    .unwrap_or_else(|| Secret::new(String::new()));
                let mut config = GeminiConfig::new(key)
                    .with_model(model)
                    .with_timeout(ai.timeout());
                if let Some(url) = &ai.base_url {
                    config = config.with_base_url(url.clone());
                }
                Ok(Arc::new(GeminiProvider::new(config)?))
            }
            AiProviderKind::OpenAiCompatible => {
                let mut config = OpenAiCompatibleConfig::new(model).with_timeout(ai.timeout());
                if let Some(key) = &ai.api_key {
                    config = config.with_api_key(key.clone());
                }
                if let Some(url) = &ai.base_url {
                    config = config.with_base_url(url.clone());
                }
                Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
            }
            AiProviderKind::Mock => Ok(Arc::new(MockAIProvider::with_model(model))),
        }
    }
}
