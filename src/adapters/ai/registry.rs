//! Provider registry keyed by model name.
//!
//! Providers are built on first use through the registry's factory and then
//! shared. The registry is an ordinary value owned by the service container.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::{AIError, AIProvider};

type ProviderFactory = dyn Fn(&str) -> Result<Arc<dyn AIProvider>, AIError> + Send + Sync;

pub struct ProviderRegistry {
    factory: Box<ProviderFactory>,
    providers: Mutex<HashMap<String, Arc<dyn AIProvider>>>,
}

impl ProviderRegistry {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn AIProvider>, AIError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the provider for `model`, building it on first request.
    ///
    /// A failed build is not cached.
    pub fn get_or_init(&self, model: &str) -> Result<Arc<dyn AIProvider>, AIError> {
        let mut providers = self.providers.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(provider) = providers.get(model) {
            return Ok(Arc::clone(provider));
        }

        let provider = (self.factory)(model)?;
        tracing::info!(model, provider = %provider.provider_info().name, "AI provider initialised");
        providers.insert(model.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.providers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builds_each_model_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let registry = ProviderRegistry::new(move |model| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockAIProvider::with_model(model)) as Arc<dyn AIProvider>)
        });

        let first = registry.get_or_init("model-a").unwrap();
        let again = registry.get_or_init("model-a").unwrap();
        let other = registry.get_or_init("model-b").unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(other.provider_info().model, "model-b");
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let registry = ProviderRegistry::new(|_| Err(AIError::Configuration("no key".into())));

        assert!(registry.get_or_init("model-a").is_err());
        assert!(registry.is_empty());
    }
}
