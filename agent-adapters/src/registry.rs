//! Provider registry mapping ids to model client factories.

use std::fmt;
use std::sync::Arc;

use agent_primitives::{DuplicatePolicy, KeyedRegistry};
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::ollama::{OLLAMA_PROVIDER_ID, OllamaAdapter, OllamaConfig};
use crate::openai::{OPENAI_PROVIDER_ID, OpenAiAdapter, OpenAiConfig};
use crate::traits::{AdapterResult, ModelRef};

type FactoryFn = dyn Fn(&ProviderConfig) -> AdapterResult<ModelRef> + Send + Sync;

/// Builds a model client from a [`ProviderConfig`].
#[derive(Clone)]
pub struct ProviderFactory(Arc<FactoryFn>);

impl ProviderFactory {
    /// Wraps a factory closure.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ProviderConfig) -> AdapterResult<ModelRef> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Invokes the factory.
    ///
    /// # Errors
    ///
    /// Propagates the factory's own failure.
    pub fn build(&self, config: &ProviderConfig) -> AdapterResult<ModelRef> {
        (self.0)(config)
    }
}

impl fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderFactory")
    }
}

/// Registry of LLM providers. Registering an existing id fails unless an
/// override is requested.
#[derive(Debug)]
pub struct ProviderRegistry {
    factories: KeyedRegistry<ProviderFactory>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: KeyedRegistry::new("provider", DuplicatePolicy::Reject),
        }
    }

    /// Creates a registry holding the `openai` and `ollama` providers.
    ///
    /// # Errors
    ///
    /// Propagates a failed registration of a built-in id.
    pub fn with_builtin_providers() -> AdapterResult<Self> {
        let registry = Self::new();
        for (id, factory) in builtin_factories() {
            registry.register(id, factory, false)?;
        }
        Ok(registry)
    }

    /// Registers `factory` under `id`. When `allow_override` is set an existing
    /// entry is replaced.
    ///
    /// # Errors
    ///
    /// Fails for blank ids, and for duplicate ids without `allow_override`.
    pub fn register(
        &self,
        id: &str,
        factory: ProviderFactory,
        allow_override: bool,
    ) -> AdapterResult<()> {
        let key = if allow_override {
            self.factories.register_with_override(id, factory)?
        } else {
            self.factories.register(id, factory)?
        };
        debug!(provider = %key, allow_override, "provider registered");
        Ok(())
    }

    /// Builds a client for `config.provider`.
    ///
    /// # Errors
    ///
    /// Fails with the sorted list of known ids when the provider is unknown,
    /// otherwise propagates the factory's failure.
    pub fn create(&self, config: &ProviderConfig) -> AdapterResult<ModelRef> {
        let factory = self.factories.get(&config.provider)?;
        let client = factory.build(config)?;
        info!(provider = %config.provider, model = %config.model, "model client created");
        Ok(client)
    }

    /// Registered provider ids in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.factories.ids()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.factories.has(id)
    }

    /// Removes every provider.
    pub fn clear(&self) {
        self.factories.clear();
    }
}

fn builtin_factories() -> [(&'static str, ProviderFactory); 2] {
    [
        (
            OPENAI_PROVIDER_ID,
            ProviderFactory::new(|config| {
                let adapter = OpenAiAdapter::new(OpenAiConfig::from_provider_config(config)?)?;
                Ok(Arc::new(adapter) as ModelRef)
            }),
        ),
        (
            OLLAMA_PROVIDER_ID,
            ProviderFactory::new(|config| {
                let adapter = OllamaAdapter::new(OllamaConfig::from_provider_config(config)?)?;
                Ok(Arc::new(adapter) as ModelRef)
            }),
        ),
    ]
}
